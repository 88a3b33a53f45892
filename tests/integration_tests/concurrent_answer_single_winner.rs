// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde_json::json;

use crate::integration_tests::common::{build_test_app, register_credential, send_batch_with_auth, sign, AuthHeaderSet};

#[tokio::test]
async fn only_one_of_many_concurrent_answerers_wins() {
    let app = build_test_app();
    let (offerer_name, offerer_secret) = register_credential(&app).await;

    let publish_params = json!({"tags": [], "offers": [{"sdp": "v=0 contended-offer"}]});
    let sig = sign(&offerer_secret, 1_000, "publish-nonce", "publishOffer", &publish_params.to_string());
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "publishOffer", "params": publish_params}]),
        Some(AuthHeaderSet {
            name: offerer_name,
            timestamp: 1_000,
            nonce: "publish-nonce".to_string(),
            signature: sig,
        }),
    )
    .await;
    let offer_id = responses[0]["result"]["offers"][0]["offerId"].as_str().unwrap().to_string();

    let mut handles = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        let offer_id = offer_id.clone();
        handles.push(tokio::spawn(async move {
            let (name, secret) = register_credential(&app).await;
            let params = json!({"offerId": offer_id, "sdp": format!("v=0 answer-{i}")});
            let nonce = format!("answer-nonce-{i}");
            let sig = sign(&secret, 5_000, &nonce, "answerOffer", &params.to_string());
            let responses = send_batch_with_auth(
                &app,
                json!([{"method": "answerOffer", "params": params}]),
                Some(AuthHeaderSet { name, timestamp: 5_000, nonce, signature: sig }),
            )
            .await;
            responses[0]["success"].as_bool().unwrap()
        }));
    }

    let mut wins = 0;
    let mut losses = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        } else {
            losses += 1;
        }
    }

    assert_eq!(wins, 1, "exactly one answerer must win the race");
    assert_eq!(losses, 7);
}
