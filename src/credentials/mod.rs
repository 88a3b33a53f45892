//! `generateCredentials` — the one public, stricter-rate-limited method that
//! mints a new identity. On a storage-level name collision, retry with a
//! fresh candidate name rather than propagating the conflict.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde_json::Value;

use crate::{
    cfg::config::Config,
    crypto::{secret, validate},
    rpc::{error::ErrorCode, methods::GenerateCredentialsParams},
    storage::{Storage, models::Credential},
    time::CREDENTIAL_TTL_MS,
};

const MAX_NAME_COLLISION_ATTEMPTS: u32 = 100;
/// 10 years, in milliseconds — the outer bound on a caller-supplied
/// `expiresAt`.
const MAX_EXPIRES_AT_HORIZON_MS: i64 = 10 * 365 * 24 * 60 * 60 * 1000;
/// Tolerance for a caller-supplied `expiresAt` that has just barely already
/// passed by the time the request lands.
const EXPIRES_AT_PAST_TOLERANCE_MS: i64 = 60_000;

/// `generateCredentials(name?, expiresAt?)` — public, admission-controlled
/// by a global credential cap and (at the HTTP layer) a per-IP rate limit.
pub async fn generate_credentials(
    storage: &dyn Storage,
    cfg: &Config,
    params: GenerateCredentialsParams,
    now: i64,
) -> Result<Value, ErrorCode> {
    let total = storage
        .get_credential_count()
        .await
        .map_err(|e| {
            tracing::error!(%e, "get_credential_count failed");
            ErrorCode::InternalError
        })?;
    if total >= cfg.max_total_credentials {
        return Err(ErrorCode::StorageFull);
    }

    if let Some(expires_at) = params.expires_at {
        if expires_at < now - EXPIRES_AT_PAST_TOLERANCE_MS {
            return Err(ErrorCode::InvalidParams);
        }
        if expires_at > now + MAX_EXPIRES_AT_HORIZON_MS {
            return Err(ErrorCode::InvalidParams);
        }
    }
    let expires_at = params.expires_at.unwrap_or(now + CREDENTIAL_TTL_MS);

    let secret_hex = secret::generate_secret_hex();
    let master_key = cfg
        .master_key_bytes()
        .map_err(|_| ErrorCode::InternalError)?;
    let secret_encrypted =
        secret::encrypt_secret(&master_key, &secret_hex).map_err(|_| ErrorCode::InternalError)?;

    let name = match params.name {
        Some(requested) => {
            validate::validate_name(&requested).map_err(|_| ErrorCode::InvalidName)?;
            let credential = Credential {
                name: requested.clone(),
                secret_encrypted: secret_encrypted.clone(),
                created_at: now,
                expires_at,
                last_used: now,
            };
            let inserted = storage
                .create_credential(credential)
                .await
                .map_err(|_| ErrorCode::InternalError)?;
            if !inserted {
                return Err(ErrorCode::InvalidName);
            }
            requested
        },
        None => generate_unique_name(storage, &secret_encrypted, now, expires_at).await?,
    };

    Ok(serde_json::json!({
        "name": name,
        "secret": secret_hex,
        "createdAt": now,
        "expiresAt": expires_at,
    }))
}

/// Generates a random name, retrying on a storage-level collision up to
/// [`MAX_NAME_COLLISION_ATTEMPTS`] times.
async fn generate_unique_name(
    storage: &dyn Storage,
    secret_encrypted: &str,
    now: i64,
    expires_at: i64,
) -> Result<String, ErrorCode> {
    for _ in 0..MAX_NAME_COLLISION_ATTEMPTS {
        let candidate = secret::generate_credential_name();
        let credential = Credential {
            name: candidate.clone(),
            secret_encrypted: secret_encrypted.to_string(),
            created_at: now,
            expires_at,
            last_used: now,
        };
        let inserted = storage
            .create_credential(credential)
            .await
            .map_err(|_| ErrorCode::InternalError)?;
        if inserted {
            return Ok(candidate);
        }
    }
    Err(ErrorCode::InternalError)
}
