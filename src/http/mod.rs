//! The HTTP front door around the RPC core: a single `POST /rpc` route plus
//! a health check. Deliberately thin — CORS, a broader routing table and
//! full header-parsing edge cases are out of scope, so this module does not
//! grow into a second surface behind the RPC one's back.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::{
    auth::AuthHeaders, cfg::config::Config, rpc::dispatch::dispatch_batch, rpc::methods::RawRequest,
    storage::Storage, time::now_ms,
};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub cfg: Arc<Config>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/rpc", post(rpc_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Extracts the four auth headers. Returns `None` as soon as any of them is
/// absent or malformed, since partial credentials are never usable — the
/// dispatcher treats a missing set the same as an unauthenticated request
/// and lets each method's own `requires_auth` decide whether that matters.
fn extract_auth_headers(headers: &HeaderMap) -> Option<AuthHeaders> {
    let get = |name: &str| headers.get(name)?.to_str().ok().map(str::to_string);
    let name = get("x-name")?;
    let timestamp: i64 = get("x-timestamp")?.parse().ok()?;
    let nonce = get("x-nonce")?;
    let signature = get("x-signature")?;
    Some(AuthHeaders { name, timestamp, nonce, signature })
}

/// Resolves the client IP per the configured trust precedence: a single
/// reverse-proxy hop is assumed, so the first hop of `x-forwarded-for` is
/// trusted exactly as much as `x-real-ip` — neither is re-validated against
/// a trusted-proxy allowlist. See SPEC_FULL.md's resolved open question on
/// this for why that's acceptable here and not in a multi-proxy deployment.
fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let header_str = |name: &str| headers.get(name)?.to_str().ok().map(str::trim).map(str::to_string);
    if let Some(ip) = header_str("cf-connecting-ip") {
        return Some(ip);
    }
    if let Some(ip) = header_str("x-real-ip") {
        return Some(ip);
    }
    if let Some(forwarded) = header_str("x-forwarded-for") {
        let first = forwarded.split(',').next()?.trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    None
}

async fn rpc_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(requests): Json<Vec<RawRequest>>,
) -> impl IntoResponse {
    let auth_headers = extract_auth_headers(&headers);
    let client_ip = extract_client_ip(&headers);
    let now = now_ms();

    let responses: Vec<Value> = dispatch_batch(
        state.storage.as_ref(),
        &state.cfg,
        requests,
        auth_headers.as_ref(),
        client_ip.as_deref(),
        now,
    )
    .await;

    (StatusCode::OK, Json(responses))
}
