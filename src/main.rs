// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use webrtc_signal_broker::{
    cfg::{config::Config, logger::init_logger},
    cleanup::spawn_cleanup_task,
    http::{AppState, build_router},
    storage::{Storage, memory::MemoryStorage},
};

#[tokio::main]
async fn main() -> Result<()> {
    let _logger_guard = init_logger()?;

    let cfg = Config::from_env().context("failed to load configuration")?;
    cfg.storage_type
        .require_implemented()
        .context("unsupported STORAGE_TYPE")?;

    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let cfg = Arc::new(cfg);

    let _cleanup_handle = spawn_cleanup_task(storage.clone(), cfg.cleanup_interval_ms);

    let app = build_router(AppState { storage, cfg: cfg.clone() });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.port))
        .await
        .with_context(|| format!("failed to bind port {}", cfg.port))?;
    tracing::info!(port = cfg.port, "webrtc-signal-broker listening");

    axum::serve(listener, app)
        .await
        .context("server exited with an error")?;

    Ok(())
}
