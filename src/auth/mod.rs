//! Per-request authentication: timestamp window, credential lookup,
//! signature verification, nonce burn, TTL touch — in that order. The
//! ordering is load-bearing (see step 4's doc comment below).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    cfg::config::Config,
    crypto::{secret::decrypt_secret, signing},
    rpc::error::ErrorCode,
    storage::{Storage, models::Credential},
    time::CREDENTIAL_TTL_MS,
};

/// The four auth headers presented on every authenticated request:
/// `X-Name`, `X-Timestamp`, `X-Nonce`, `X-Signature`.
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    pub name: String,
    pub timestamp: i64,
    pub nonce: String,
    pub signature: String,
}

/// Runs the five-step verification sequence and returns the caller's
/// credential row on success. Any failure collapses to
/// [`ErrorCode::InvalidCredentials`] — the cause is never surfaced to the
/// client, so a wrong secret and an unknown name look identical and a
/// client cannot enumerate valid credential names.
pub async fn verify_request(
    storage: &dyn Storage,
    cfg: &Config,
    headers: &AuthHeaders,
    method: &str,
    params_json: &str,
    now: i64,
) -> Result<Credential, ErrorCode> {
    // 1. Timestamp window.
    if now - headers.timestamp > cfg.timestamp_max_age_ms
        || headers.timestamp - now > cfg.timestamp_max_future_ms
    {
        return Err(ErrorCode::InvalidCredentials);
    }

    // 2. Credential lookup. Missing name is indistinguishable from a wrong
    // secret to the client, preventing name enumeration.
    let credential = storage
        .get_credential(&headers.name)
        .await
        .map_err(|_| ErrorCode::InternalError)?
        .ok_or(ErrorCode::InvalidCredentials)?;

    // 3. Signature verification over the canonical message.
    let master_key = cfg
        .master_key_bytes()
        .map_err(|_| ErrorCode::InternalError)?;
    let secret_hex = decrypt_secret(&master_key, &credential.secret_encrypted)
        .map_err(|_| ErrorCode::InvalidCredentials)?;
    let secret_bytes = hex::decode(&secret_hex).map_err(|_| ErrorCode::InvalidCredentials)?;

    let message =
        signing::canonical_message(headers.timestamp, &headers.nonce, method, params_json);
    if !signing::verify(&secret_bytes, &message, &headers.signature) {
        return Err(ErrorCode::InvalidCredentials);
    }

    // 4. Nonce burn — only after the signature verifies. A pre-check burn
    // would let an unauthenticated attacker exhaust a legitimate nonce by
    // replaying a guessed (name, nonce) pair before the real client's call
    // lands, denying that client service without ever forging a signature.
    let nonce_key = format!("nonce:{}:{}", headers.name, headers.nonce);
    let nonce_expires_at = headers.timestamp + cfg.timestamp_max_age_ms;
    let freshly_inserted = storage
        .check_and_mark_nonce(&nonce_key, nonce_expires_at)
        .await
        .map_err(|_| ErrorCode::InternalError)?;
    if !freshly_inserted {
        return Err(ErrorCode::InvalidCredentials);
    }

    // 5. Credential TTL touch.
    storage
        .touch_credential(&headers.name, now, now + CREDENTIAL_TTL_MS)
        .await
        .map_err(|_| ErrorCode::InternalError)?;

    Ok(credential)
}
