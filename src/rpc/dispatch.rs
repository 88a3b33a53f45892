//! Batch ingress: per-IP rate limiting, cumulative operation precounting,
//! per-request auth classification and dispatch, response assembly.
//!
//! Handlers within one batch execute strictly sequentially — never via
//! `join_all` — so that the cumulative operation budget and per-index error
//! locality hold. Different batches run concurrently on separate
//! Tokio tasks via the HTTP front door's per-connection model; no in-memory
//! state is shared across batches outside `Arc<dyn Storage>`.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde_json::Value;

use crate::{
    auth::{self, AuthHeaders},
    cfg::config::Config,
    credentials,
    rpc::{
        error::{ErrorCode, RpcError},
        methods::{RawRequest, RpcMethod},
    },
    signaling,
    storage::Storage,
};

/// General per-IP rate-limit window: one second.
const GENERAL_RATE_LIMIT_WINDOW_MS: i64 = 1_000;

fn success(result: Value) -> Value {
    serde_json::json!({"success": true, "result": result})
}

fn failure(err: RpcError) -> Value {
    serde_json::json!({"success": false, "error": err.error, "errorCode": err.code})
}

/// Runs one parsed batch to completion and returns the index-aligned
/// response array.
pub async fn dispatch_batch(
    storage: &dyn Storage,
    cfg: &Config,
    requests: Vec<RawRequest>,
    auth_headers: Option<&AuthHeaders>,
    client_ip: Option<&str>,
    now: i64,
) -> Vec<Value> {
    let n = requests.len();

    if let Some(ip) = client_ip {
        let identifier = format!("ip:{ip}");
        let within_limit = storage
            .check_rate_limit(
                &identifier,
                u64::from(cfg.requests_per_ip_per_second),
                GENERAL_RATE_LIMIT_WINDOW_MS,
                now,
            )
            .await
            .unwrap_or(true);
        if !within_limit {
            return vec![failure(RpcError::new(ErrorCode::RateLimitExceeded)); n];
        }
    }

    if n > cfg.max_batch_size {
        return vec![failure(RpcError::new(ErrorCode::BatchTooLarge)); n];
    }

    let total_ops: usize = requests.iter().map(RawRequest::op_weight).sum();
    if total_ops > cfg.max_total_operations {
        return vec![failure(RpcError::new(ErrorCode::BatchTooLarge)); n];
    }

    let mut responses = Vec::with_capacity(n);
    for raw in requests {
        responses.push(dispatch_one(storage, cfg, &raw, auth_headers, client_ip, now).await);
    }
    responses
}

async fn dispatch_one(
    storage: &dyn Storage,
    cfg: &Config,
    raw: &RawRequest,
    auth_headers: Option<&AuthHeaders>,
    client_ip: Option<&str>,
    now: i64,
) -> Value {
    let method = match RpcMethod::decode(raw) {
        Ok(method) => method,
        Err(code) => return failure(RpcError::new(code)),
    };

    let caller: Option<String> = if raw.requires_auth() {
        let Some(headers) = auth_headers else {
            return failure(RpcError::new(ErrorCode::AuthRequired));
        };
        match auth::verify_request(storage, cfg, headers, &raw.method, &raw.params_json(), now)
            .await
        {
            Ok(credential) => Some(credential.name),
            Err(code) => return failure(RpcError::new(code)),
        }
    } else {
        auth_headers.map(|h| h.name.clone())
    };

    let result = match method {
        RpcMethod::GenerateCredentials(params) => {
            match credentials_rate_limited(storage, cfg, client_ip, now).await {
                Ok(()) => credentials::generate_credentials(storage, cfg, params, now).await,
                Err(code) => Err(code),
            }
        },
        other => run_authenticated_method(storage, cfg, other, caller, now).await,
    };

    match result {
        Ok(value) => success(value),
        Err(code) => failure(RpcError::new(code)),
    }
}

/// `generateCredentials`'s per-IP rate limit, with the shared 2/s fallback
/// bucket when the caller's IP could not be determined — this guards
/// against a proxy-misconfiguration attacker hiding behind an absent IP to
/// bypass the per-IP bucket entirely.
async fn credentials_rate_limited(
    storage: &dyn Storage,
    cfg: &Config,
    client_ip: Option<&str>,
    now: i64,
) -> Result<(), ErrorCode> {
    let (identifier, limit) = match client_ip {
        Some(ip) => (
            format!("cred:{ip}"),
            u64::from(cfg.credentials_per_ip_per_second),
        ),
        None => ("cred:unknown".to_string(), 2u64),
    };
    let within_limit = storage
        .check_rate_limit(&identifier, limit, GENERAL_RATE_LIMIT_WINDOW_MS, now)
        .await
        .map_err(|_| ErrorCode::InternalError)?;
    if within_limit {
        Ok(())
    } else {
        Err(ErrorCode::RateLimitExceeded)
    }
}

/// Runs any method other than `generateCredentials`, with `discover`
/// treated as public (self-exclusion only, no auth enforced) and everything
/// else requiring `caller` to be `Some`.
async fn run_authenticated_method(
    storage: &dyn Storage,
    cfg: &Config,
    method: RpcMethod,
    caller: Option<String>,
    now: i64,
) -> Result<Value, ErrorCode> {
    match method {
        RpcMethod::GenerateCredentials(_) => unreachable!("handled by the caller"),
        RpcMethod::Discover(params) => {
            signaling::discover(storage, caller.as_deref(), params, now).await
        },
        RpcMethod::PublishOffer(params) => {
            let username = caller.ok_or(ErrorCode::AuthRequired)?;
            signaling::publish_offer(storage, cfg, &username, params, now).await
        },
        RpcMethod::AnswerOffer(params) => {
            let username = caller.ok_or(ErrorCode::AuthRequired)?;
            signaling::answer_offer(storage, cfg, &username, params, now).await
        },
        RpcMethod::GetOfferAnswer(params) => {
            let username = caller.ok_or(ErrorCode::AuthRequired)?;
            signaling::get_offer_answer(storage, &username, params, now).await
        },
        RpcMethod::AddIceCandidates(params) => {
            let username = caller.ok_or(ErrorCode::AuthRequired)?;
            signaling::add_ice_candidates(storage, cfg, &username, params, now).await
        },
        RpcMethod::GetIceCandidates(params) => {
            let username = caller.ok_or(ErrorCode::AuthRequired)?;
            signaling::get_ice_candidates(storage, &username, params, now).await
        },
        RpcMethod::Poll(params) => {
            let username = caller.ok_or(ErrorCode::AuthRequired)?;
            signaling::poll(storage, &username, params, now).await
        },
        RpcMethod::DeleteOffer(params) => {
            let username = caller.ok_or(ErrorCode::AuthRequired)?;
            signaling::delete_offer(storage, &username, params, now).await
        },
    }
}
