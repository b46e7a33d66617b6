// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Service health probe

use anyhow::Result;
use colored::Colorize;
use std::convert::Infallible;
use std::sync::Arc;

use taskdeck_core::application::polling::{PollEvent, PollingScheduler};
use taskdeck_core::infrastructure::api_client::HealthStatus;

use super::{ClientContext, ClientOverrides};
use crate::render;

pub async fn run(watch: bool, overrides: ClientOverrides) -> Result<()> {
    let ctx = ClientContext::connect(&overrides)?;
    let base = ctx.api.endpoints().base().to_string();

    if !watch {
        let status = ctx.api.health().await;
        print_status(&base, status);
        if !status.is_ok() {
            anyhow::bail!("Service at {} is not healthy", base);
        }
        return Ok(());
    }

    let api = Arc::clone(&ctx.api);
    let mut schedule = PollingScheduler::start(
        "health",
        ctx.config.polling.health_policy(),
        move || {
            let api = Arc::clone(&api);
            async move { Ok::<HealthStatus, Infallible>(api.health().await) }
        },
        |_| false,
    );

    let mut last = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = schedule.next() => match event {
                Some(PollEvent::Fetched(status)) => {
                    // only print transitions
                    if last != Some(status) {
                        print_status(&base, status);
                        last = Some(status);
                    }
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    schedule.shutdown().await;
    Ok(())
}

fn print_status(base: &str, status: HealthStatus) {
    println!(
        "{} {} {}",
        chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
        base,
        render::format_health(status)
    );
}
