// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Use cases built on the domain ports: session issuance, request and
//! response authorization, graph operations, account administration.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrates the codec, the registry and the graph store per request

pub mod admin_service;
pub mod authorization_filter;
pub mod graph_service;
pub mod requests;
pub mod responses;
pub mod session_service;
