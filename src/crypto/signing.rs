// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Builds the canonical message signed by the client and verified by the
/// server: `"{timestamp}:{nonce}:{method}:{paramsJson}"`.
///
/// `params_json` must already be the exact JSON text the client sent (or
/// `"{}"` when params is absent) — this crate does not re-canonicalize it.
/// See the dispatcher's module docs for why insertion order, not sorted
/// keys, is the convention this server commits to.
pub fn canonical_message(timestamp: i64, nonce: &str, method: &str, params_json: &str) -> String {
    format!("{timestamp}:{nonce}:{method}:{params_json}")
}

/// Signs `message` with `secret` under HMAC-SHA256, base64-encoded.
pub fn sign(secret: &[u8], message: &str) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .expect("HMAC accepts a key of any length");
    mac.update(message.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Verifies `signature_b64` against `message` under HMAC-SHA256 in constant
/// time. Returns `false` on any malformed base64 rather than erroring, since
/// a malformed signature and a wrong one are the same outcome to the caller
/// (`INVALID_CREDENTIALS`).
pub fn verify(secret: &[u8], message: &str, signature_b64: &str) -> bool {
    let Ok(sig_bytes) = BASE64.decode(signature_b64) else {
        return false;
    };
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(secret) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&sig_bytes).is_ok()
}
