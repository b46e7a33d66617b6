// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0
//! taskdeck core
//!
//! Task-state synchronization for the taskdeck client.
//!
//! # Architecture
//!
//! - **domain:** task model, stream events, ports and configuration
//! - **application:** state merger, polling scheduler, task view, follow
//! - **infrastructure:** HTTP API client and server-sent event connector

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
