// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::Rng;

use crate::crypto::error::CryptoError;

const IV_LEN: usize = 12;
const SECRET_BYTES: usize = 32;
const NAME_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates a fresh 32-byte credential secret, hex-encoded (64 chars),
/// matching the wire/storage representation in the data model.
pub fn generate_secret_hex() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Generates a 6-10 character base36 credential name candidate. Uniqueness
/// against storage is the caller's responsibility (retry on collision).
pub fn generate_credential_name() -> String {
    let mut rng = rand::rng();
    let len = rng.random_range(6..=10);
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..NAME_ALPHABET.len());
            NAME_ALPHABET[idx] as char
        })
        .collect()
}

/// Encrypts `secret_hex` under AES-256-GCM with `master_key`, returning
/// `base64(iv || ciphertext || tag)`.
pub fn encrypt_secret(master_key: &[u8; 32], secret_hex: &str) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(master_key));

    let mut iv_bytes = [0u8; IV_LEN];
    rand::rng().fill(&mut iv_bytes);
    let nonce = Nonce::from_slice(&iv_bytes);

    let ciphertext = cipher
        .encrypt(nonce, secret_hex.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(out))
}

/// Decrypts a value produced by [`encrypt_secret`]. Any failure — malformed
/// base64, short buffer, or a failed AEAD tag check — is folded into the
/// same [`CryptoError::DecryptionFailed`] so callers can fail-closed as
/// "credential not found" without distinguishing the cause.
pub fn decrypt_secret(master_key: &[u8; 32], encrypted_b64: &str) -> Result<String, CryptoError> {
    let raw = BASE64
        .decode(encrypted_b64)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    if raw.len() <= IV_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let (iv_bytes, ciphertext) = raw.split_at(IV_LEN);
    let nonce = Nonce::from_slice(iv_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(master_key));
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}
