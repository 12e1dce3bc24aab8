// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Cogged CLI

pub mod config;
pub mod keygen;
pub mod serve;

pub use self::config::ConfigCommand;
pub use self::serve::ServeArgs;
