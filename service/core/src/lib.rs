// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cogged Core
//!
//! Authorization subsystem of the Cogged graph service: a capability codec
//! for signed node, user and session descriptors, a single-worker registry
//! owning all mutable authorization state, and the filter that combines both
//! at request and response time.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application services, infrastructure adapters
//!   and the HTTP presentation layer

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
