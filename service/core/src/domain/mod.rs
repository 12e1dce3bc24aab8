// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value objects, ports and errors of the authorization core.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Descriptor payloads, permission flags, identities, the
//!   registry and graph store ports, configuration

pub mod config;
pub mod descriptor;
pub mod errors;
pub mod graph;
pub mod identity;
pub mod permissions;
pub mod registry;
pub mod store;
