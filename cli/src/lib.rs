// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0
//! taskdeck CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Command handlers and terminal rendering over `taskdeck_core`

pub mod commands;
pub mod render;
