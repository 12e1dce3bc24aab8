// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`cogged-core`)
//!
//! HTTP surface that translates external requests into application service
//! calls. Authorization decisions live in `crate::application`; this layer
//! only maps their outcomes onto status codes.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP (Axum) | Auth, graph, user and admin endpoints behind bearer-session middleware |

pub mod api;
