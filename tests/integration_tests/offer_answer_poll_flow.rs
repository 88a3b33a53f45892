// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde_json::json;

use crate::integration_tests::common::{build_test_app, register_credential, send_batch_with_auth, sign, AuthHeaderSet};

#[tokio::test]
async fn publish_discover_answer_and_poll_round_trip() {
    let app = build_test_app();
    let (offerer_name, offerer_secret) = register_credential(&app).await;
    let (answerer_name, answerer_secret) = register_credential(&app).await;

    // Offerer publishes one offer tagged "video".
    let publish_params = json!({"tags": ["video"], "offers": [{"sdp": "v=0 offer-sdp"}]});
    let sig = sign(&offerer_secret, 1_000, "n1", "publishOffer", &publish_params.to_string());
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "publishOffer", "params": publish_params}]),
        Some(AuthHeaderSet {
            name: offerer_name.clone(),
            timestamp: 1_000,
            nonce: "n1".to_string(),
            signature: sig,
        }),
    )
    .await;
    assert_eq!(responses[0]["success"], json!(true));
    let offer_id = responses[0]["result"]["offers"][0]["offerId"].as_str().unwrap().to_string();

    // Answerer discovers it by tag, without authentication.
    let discover_params = json!({"tags": ["video"], "limit": 10});
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "discover", "params": discover_params}]),
        None,
    )
    .await;
    assert_eq!(responses[0]["success"], json!(true));
    let found = responses[0]["result"]["offers"][0]["offerId"].as_str().unwrap();
    assert_eq!(found, offer_id);

    // Answerer answers it.
    let answer_params = json!({"offerId": offer_id, "sdp": "v=0 answer-sdp"});
    let sig = sign(&answerer_secret, 2_000, "n2", "answerOffer", &answer_params.to_string());
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "answerOffer", "params": answer_params}]),
        Some(AuthHeaderSet {
            name: answerer_name,
            timestamp: 2_000,
            nonce: "n2".to_string(),
            signature: sig,
        }),
    )
    .await;
    assert_eq!(responses[0]["success"], json!(true));

    // Offerer fetches the answer.
    let get_answer_params = json!({"offerId": offer_id});
    let sig = sign(&offerer_secret, 3_000, "n3", "getOfferAnswer", &get_answer_params.to_string());
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "getOfferAnswer", "params": get_answer_params}]),
        Some(AuthHeaderSet {
            name: offerer_name,
            timestamp: 3_000,
            nonce: "n3".to_string(),
            signature: sig,
        }),
    )
    .await;
    assert_eq!(responses[0]["success"], json!(true));
    assert_eq!(responses[0]["result"]["sdp"], json!("v=0 answer-sdp"));
}
