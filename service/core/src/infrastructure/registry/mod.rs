// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Authorization Registry Actor
//!
//! ```text
//!  handler ─┐                      ┌────────────────────────┐
//!  handler ─┼─► bounded mpsc ─────►│ worker task            │
//!  handler ─┘   (backpressure)     │  RegistryState (maps)  │
//!      ▲                           └───────────┬────────────┘
//!      └──────────── oneshot reply ────────────┘
//! ```
//!
//! One tokio task applies requests strictly in arrival order. See
//! [`crate::domain::registry`] for which operations wait for a reply.

pub mod actor;
pub mod protocol;
pub mod state;

pub use actor::{RegistryActor, RegistryHandle};
