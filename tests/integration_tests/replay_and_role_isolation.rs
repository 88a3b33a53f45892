// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde_json::json;

use crate::integration_tests::common::{build_test_app, register_credential, send_batch_with_auth, sign, AuthHeaderSet};

#[tokio::test]
async fn replaying_a_nonce_is_rejected() {
    let app = build_test_app();
    let (name, secret) = register_credential(&app).await;

    let params = json!({"tags": []});
    let sig = sign(&secret, 1_000, "reused-nonce", "discover", &params.to_string());
    let headers = AuthHeaderSet {
        name,
        timestamp: 1_000,
        nonce: "reused-nonce".to_string(),
        signature: sig,
    };

    let first = send_batch_with_auth(
        &app,
        json!([{"method": "discover", "params": params}]),
        Some(AuthHeaderSet {
            name: headers.name.clone(),
            timestamp: headers.timestamp,
            nonce: headers.nonce.clone(),
            signature: headers.signature.clone(),
        }),
    )
    .await;
    // discover is public; auth headers are optional and not verified here,
    // but answerOffer below requires them, so replay the same nonce there.
    assert_eq!(first[0]["success"], json!(true));

    let protected_params = json!({"offerId": "nonexistent"});
    let sig = sign(&secret, 1_000, "reused-nonce", "deleteOffer", &protected_params.to_string());
    let replayed = send_batch_with_auth(
        &app,
        json!([{"method": "deleteOffer", "params": protected_params}]),
        Some(AuthHeaderSet {
            name: headers.name,
            timestamp: 1_000,
            nonce: "reused-nonce".to_string(),
            signature: sig,
        }),
    )
    .await;
    assert_eq!(replayed[0]["success"], json!(false));
    assert_eq!(replayed[0]["errorCode"], json!("INVALID_CREDENTIALS"));
}

#[tokio::test]
async fn ice_candidates_are_never_visible_to_their_own_submitter() {
    let app = build_test_app();
    let (offerer_name, offerer_secret) = register_credential(&app).await;
    let (answerer_name, answerer_secret) = register_credential(&app).await;

    let publish_params = json!({"tags": [], "offers": [{"sdp": "v=0 role-isolation"}]});
    let sig = sign(&offerer_secret, 1_000, "n1", "publishOffer", &publish_params.to_string());
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "publishOffer", "params": publish_params}]),
        Some(AuthHeaderSet { name: offerer_name.clone(), timestamp: 1_000, nonce: "n1".to_string(), signature: sig }),
    )
    .await;
    let offer_id = responses[0]["result"]["offers"][0]["offerId"].as_str().unwrap().to_string();

    let answer_params = json!({"offerId": offer_id, "sdp": "v=0 answer"});
    let sig = sign(&answerer_secret, 2_000, "n2", "answerOffer", &answer_params.to_string());
    send_batch_with_auth(
        &app,
        json!([{"method": "answerOffer", "params": answer_params}]),
        Some(AuthHeaderSet { name: answerer_name.clone(), timestamp: 2_000, nonce: "n2".to_string(), signature: sig }),
    )
    .await;

    // Offerer submits an ICE candidate.
    let ice_params = json!({"offerId": offer_id, "candidates": [{"sdpMid": "0"}]});
    let sig = sign(&offerer_secret, 3_000, "n3", "addIceCandidates", &ice_params.to_string());
    send_batch_with_auth(
        &app,
        json!([{"method": "addIceCandidates", "params": ice_params}]),
        Some(AuthHeaderSet { name: offerer_name.clone(), timestamp: 3_000, nonce: "n3".to_string(), signature: sig }),
    )
    .await;

    // The offerer polling its own ICE candidates never sees its own role's
    // submissions back.
    let get_params = json!({"offerId": offer_id, "since": 0});
    let sig = sign(&offerer_secret, 4_000, "n4", "getIceCandidates", &get_params.to_string());
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "getIceCandidates", "params": get_params}]),
        Some(AuthHeaderSet { name: offerer_name, timestamp: 4_000, nonce: "n4".to_string(), signature: sig }),
    )
    .await;
    assert_eq!(responses[0]["success"], json!(true));
    assert_eq!(responses[0]["result"]["candidates"].as_array().unwrap().len(), 0);

    // The answerer, polling, does see the offerer's candidate.
    let get_params = json!({"offerId": offer_id, "since": 0});
    let sig = sign(&answerer_secret, 5_000, "n5", "getIceCandidates", &get_params.to_string());
    let responses = send_batch_with_auth(
        &app,
        json!([{"method": "getIceCandidates", "params": get_params}]),
        Some(AuthHeaderSet { name: answerer_name, timestamp: 5_000, nonce: "n5".to_string(), signature: sig }),
    )
    .await;
    assert_eq!(responses[0]["result"]["candidates"].as_array().unwrap().len(), 1);
}
