// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod task;
pub mod events;
pub mod source;
pub mod stream;
pub mod client_config;
