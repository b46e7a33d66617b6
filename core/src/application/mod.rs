// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod merger;
pub mod polling;
pub mod task_view;
pub mod follow;
