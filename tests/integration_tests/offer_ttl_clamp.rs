// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde_json::json;

use crate::integration_tests::common::{build_app_with_config, register_credential, send_batch_with_auth, sign, test_config, AuthHeaderSet};

#[tokio::test]
async fn a_ttl_below_the_minimum_is_clamped_up() {
    let cfg = test_config();
    let min = cfg.offer_min_ttl_ms;
    let app = build_app_with_config(cfg);
    let (name, secret) = register_credential(&app).await;

    let params = json!({"tags": [], "offers": [{"sdp": "v=0 short-ttl"}], "ttl": 1});
    let sig = sign(&secret, 1_000, "n1", "publishOffer", &params.to_string());
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "publishOffer", "params": params}]),
        Some(AuthHeaderSet { name, timestamp: 1_000, nonce: "n1".to_string(), signature: sig }),
    )
    .await;

    assert_eq!(responses[0]["success"], json!(true));
    let expires_at = responses[0]["result"]["expiresAt"].as_i64().unwrap();
    assert_eq!(expires_at, 1_000 + min);
}

#[tokio::test]
async fn a_ttl_above_the_maximum_is_clamped_down() {
    let cfg = test_config();
    let max = cfg.offer_max_ttl_ms;
    let app = build_app_with_config(cfg);
    let (name, secret) = register_credential(&app).await;

    let params = json!({"tags": [], "offers": [{"sdp": "v=0 long-ttl"}], "ttl": max * 100});
    let sig = sign(&secret, 2_000, "n2", "publishOffer", &params.to_string());
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "publishOffer", "params": params}]),
        Some(AuthHeaderSet { name, timestamp: 2_000, nonce: "n2".to_string(), signature: sig }),
    )
    .await;

    assert_eq!(responses[0]["success"], json!(true));
    let expires_at = responses[0]["result"]["expiresAt"].as_i64().unwrap();
    assert_eq!(expires_at, 2_000 + max);
}
