// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde_json::json;
use webrtc_signal_broker::{
    cfg::config::{Config, StorageKind},
    rpc::{dispatch::dispatch_batch, methods::RawRequest},
    storage::memory::MemoryStorage,
};

fn test_config() -> Config {
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
        requests_per_ip_per_second: 2,
    }
}

#[tokio::test]
async fn a_third_request_from_the_same_ip_within_the_window_is_rate_limited() {
    let storage = MemoryStorage::new();
    let cfg = test_config();

    for _ in 0..2 {
        let requests = vec![RawRequest { method: "discover".to_string(), params: Some(json!({"tags": []})) }];
        let responses = dispatch_batch(&storage, &cfg, requests, None, Some("203.0.113.5"), 1_000).await;
        assert_eq!(responses[0]["success"], json!(true));
    }

    let requests = vec![RawRequest { method: "discover".to_string(), params: Some(json!({"tags": []})) }];
    let responses = dispatch_batch(&storage, &cfg, requests, None, Some("203.0.113.5"), 1_000).await;
    assert_eq!(responses[0]["success"], json!(false));
    assert_eq!(responses[0]["errorCode"], json!("RATE_LIMIT_EXCEEDED"));
}

#[tokio::test]
async fn different_ips_get_independent_buckets() {
    let storage = MemoryStorage::new();
    let cfg = test_config();

    for _ in 0..2 {
        let requests = vec![RawRequest { method: "discover".to_string(), params: Some(json!({"tags": []})) }];
        dispatch_batch(&storage, &cfg, requests, None, Some("203.0.113.5"), 1_000).await;
    }

    let requests = vec![RawRequest { method: "discover".to_string(), params: Some(json!({"tags": []})) }];
    let responses = dispatch_batch(&storage, &cfg, requests, None, Some("198.51.100.9"), 1_000).await;
    assert_eq!(responses[0]["success"], json!(true));
}

#[tokio::test]
async fn the_rate_limit_window_resets_after_it_elapses() {
    let storage = MemoryStorage::new();
    let cfg = test_config();

    for _ in 0..2 {
        let requests = vec![RawRequest { method: "discover".to_string(), params: Some(json!({"tags": []})) }];
        dispatch_batch(&storage, &cfg, requests, None, Some("203.0.113.5"), 1_000).await;
    }

    let requests = vec![RawRequest { method: "discover".to_string(), params: Some(json!({"tags": []})) }];
    let responses = dispatch_batch(&storage, &cfg, requests, None, Some("203.0.113.5"), 3_500).await;
    assert_eq!(responses[0]["success"], json!(true));
}
