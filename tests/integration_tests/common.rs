// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;
use webrtc_signal_broker::{
    cfg::config::{Config, StorageKind},
    http::{AppState, build_router},
    storage::memory::MemoryStorage,
};

pub fn test_config() -> Config {
    Config {
        port: 8080,
        storage_type: StorageKind::Memory,
        storage_path: None,
        database_url: None,
        db_pool_size: 10,
        cors_origins: "*".to_string(),
        master_encryption_key: Some("a".repeat(64)),
        node_env: "production".to_string(),
        offer_default_ttl_ms: 120_000,
        offer_min_ttl_ms: 60_000,
        offer_max_ttl_ms: 3_600_000,
        cleanup_interval_ms: 60_000,
        max_offers_per_request: 100,
        max_batch_size: 50,
        max_total_operations: 1000,
        max_sdp_size: 10_000,
        max_candidate_size: 2_000,
        max_candidate_depth: 10,
        max_candidates_per_request: 50,
        timestamp_max_age_ms: 60_000,
        timestamp_max_future_ms: 60_000,
        max_offers_per_user: 1000,
        max_total_offers: 100_000,
        max_total_credentials: 100_000,
        max_ice_candidates_per_offer: 500,
        credentials_per_ip_per_second: 1,
        requests_per_ip_per_second: 20,
    }
}

pub fn build_test_app() -> Router {
    build_app_with_config(test_config())
}

pub fn build_app_with_config(cfg: Config) -> Router {
    build_router(AppState {
        storage: Arc::new(MemoryStorage::new()),
        cfg: Arc::new(cfg),
    })
}

/// Sends one unauthenticated batch request and returns the parsed response
/// array.
pub async fn send_batch(app: &Router, batch: Value) -> Vec<Value> {
    send_batch_with_auth(app, batch, None).await
}

pub struct AuthHeaderSet {
    pub name: String,
    pub timestamp: i64,
    pub nonce: String,
    pub signature: String,
}

pub async fn send_batch_with_auth(
    app: &Router,
    batch: Value,
    auth: Option<AuthHeaderSet>,
) -> Vec<Value> {
    send_batch_full(app, batch, auth, None).await
}

/// `ip` is injected as `x-real-ip` so each caller lands in its own rate-limit
/// bucket — tests that mint many credentials in quick succession need
/// distinct callers, exactly like distinct clients would in production.
pub async fn send_batch_full(
    app: &Router,
    batch: Value,
    auth: Option<AuthHeaderSet>,
    ip: Option<&str>,
) -> Vec<Value> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/rpc")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = &auth {
        builder = builder
            .header("x-name", &auth.name)
            .header("x-timestamp", auth.timestamp.to_string())
            .header("x-nonce", &auth.nonce)
            .header("x-signature", &auth.signature);
    }
    if let Some(ip) = ip {
        builder = builder.header("x-real-ip", ip);
    }
    let request = builder.body(Body::from(serde_json::to_vec(&batch).unwrap())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers a new credential directly via the public `generateCredentials`
/// method and returns its name and plaintext secret. Each call uses a fresh
/// synthetic source IP so the per-IP credential rate limit never interferes
/// with a test that mints several credentials back to back.
pub async fn register_credential(app: &Router) -> (String, String) {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let ip = format!("10.0.0.{}", COUNTER.fetch_add(1, Ordering::Relaxed) % 250 + 1);

    let batch = serde_json::json!([{"method": "generateCredentials", "params": {}}]);
    let responses = send_batch_full(app, batch, None, Some(&ip)).await;
    let result = &responses[0]["result"];
    (
        result["name"].as_str().unwrap().to_string(),
        result["secret"].as_str().unwrap().to_string(),
    )
}

pub fn sign(secret_hex: &str, ts: i64, nonce: &str, method: &str, params_json: &str) -> String {
    use webrtc_signal_broker::crypto::signing;
    let secret_bytes = hex::decode(secret_hex).unwrap();
    let message = signing::canonical_message(ts, nonce, method, params_json);
    signing::sign(&secret_bytes, &message)
}
