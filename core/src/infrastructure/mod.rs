// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod api_client;
pub mod event_stream;
