//! Background expiry sweep: a single long-lived task woken on a fixed
//! interval rather than a cron-style external scheduler.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use crate::{storage::Storage, time::now_ms};

/// Spawns the periodic sweep and returns its join handle. The caller keeps
/// the handle alive for the process lifetime; dropping it does not abort
/// the task (`tokio::spawn` detaches on drop).
pub fn spawn_cleanup_task(storage: Arc<dyn Storage>, interval_ms: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
        // The first tick fires immediately; skip it so startup doesn't race
        // a sweep against the very first requests.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_sweep(storage.as_ref()).await;
        }
    })
}

async fn run_sweep(storage: &dyn Storage) {
    let now = now_ms();

    match storage.delete_expired_offers(now).await {
        Ok(0) => tracing::debug!("cleanup sweep: no expired offers"),
        Ok(n) => tracing::info!(removed = n, "cleanup sweep: removed expired offers"),
        Err(e) => tracing::error!(%e, "cleanup sweep: delete_expired_offers failed"),
    }

    match storage.delete_expired_credentials(now).await {
        Ok(0) => tracing::debug!("cleanup sweep: no expired credentials"),
        Ok(n) => tracing::info!(removed = n, "cleanup sweep: removed expired credentials"),
        Err(e) => tracing::error!(%e, "cleanup sweep: delete_expired_credentials failed"),
    }

    match storage.delete_expired_nonces(now).await {
        Ok(0) => tracing::debug!("cleanup sweep: no expired nonces"),
        Ok(n) => tracing::info!(removed = n, "cleanup sweep: removed expired nonces"),
        Err(e) => tracing::error!(%e, "cleanup sweep: delete_expired_nonces failed"),
    }
}
