// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Initializes a global JSON tracing subscriber reading its level from
/// `RUST_LOG` (falling back to `info`). Returns the non-blocking writer's
/// guard — the caller must keep it alive for the process lifetime.
pub fn init_logger() -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to build log level filter")?;

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let json_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_current_span(true)
        .with_span_list(false)
        .json();

    let subscriber = Registry::default().with(env_filter).with(json_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global default subscriber")?;

    Ok(guard)
}
