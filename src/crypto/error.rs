// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Typed failures from the crypto/validation layer. Callers at the RPC
/// boundary collapse these into the stable [`crate::rpc::error::ErrorCode`]
/// taxonomy; tests assert on the specific variant here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("name must be 3-32 chars of [a-z0-9._-]")]
    InvalidName,
    #[error("tag must be a non-empty printable token with no spaces or control characters")]
    InvalidTag,
    #[error("sdp must be a non-empty string")]
    InvalidSdp,
    #[error("sdp exceeds the maximum size of {max} bytes")]
    SdpTooLarge { max: usize },
    #[error("candidate exceeds the maximum nesting depth of {max}")]
    CandidateTooDeep { max: usize },
    #[error("candidate serialized size exceeds the maximum of {max} bytes")]
    CandidateTooLarge { max: usize },
    #[error("failed to encrypt secret at rest")]
    EncryptionFailed,
    #[error("failed to decrypt stored secret")]
    DecryptionFailed,
}
