// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::Serialize;

/// Stable string error codes returned to clients. Serializes exactly as the
/// taxonomy names it — never change a variant's wire string without also
/// versioning the API, since clients match on these by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    // Auth
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired,
    /// Covers unknown credential name, bad signature, bad/replayed nonce,
    /// and stale/future timestamp — deliberately indistinguishable so a
    /// client cannot enumerate valid names.
    #[serde(rename = "INVALID_CREDENTIALS")]
    InvalidCredentials,

    // Validation
    #[serde(rename = "INVALID_NAME")]
    InvalidName,
    #[serde(rename = "INVALID_TAG")]
    InvalidTag,
    #[serde(rename = "INVALID_SDP")]
    InvalidSdp,
    #[serde(rename = "INVALID_PARAMS")]
    InvalidParams,
    #[serde(rename = "MISSING_PARAMS")]
    MissingParams,

    // Resource
    #[serde(rename = "OFFER_NOT_FOUND")]
    OfferNotFound,
    #[serde(rename = "OFFER_ALREADY_ANSWERED")]
    OfferAlreadyAnswered,
    #[serde(rename = "OFFER_NOT_ANSWERED")]
    OfferNotAnswered,
    #[serde(rename = "NO_AVAILABLE_OFFERS")]
    NoAvailableOffers,

    // Authorization
    #[serde(rename = "NOT_AUTHORIZED")]
    NotAuthorized,
    #[serde(rename = "OWNERSHIP_MISMATCH")]
    OwnershipMismatch,

    // Limits
    #[serde(rename = "TOO_MANY_OFFERS")]
    TooManyOffers,
    #[serde(rename = "SDP_TOO_LARGE")]
    SdpTooLarge,
    #[serde(rename = "BATCH_TOO_LARGE")]
    BatchTooLarge,
    #[serde(rename = "RATE_LIMIT_EXCEEDED")]
    RateLimitExceeded,
    #[serde(rename = "TOO_MANY_OFFERS_PER_USER")]
    TooManyOffersPerUser,
    #[serde(rename = "STORAGE_FULL")]
    StorageFull,
    #[serde(rename = "TOO_MANY_ICE_CANDIDATES")]
    TooManyIceCandidates,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "UNKNOWN_METHOD")]
    UnknownMethod,
}

impl ErrorCode {
    /// The generic human-readable message paired with this code in
    /// responses. Business handlers may supply a more specific message at
    /// the call site; this is the fallback for codes raised without one
    /// (e.g. from the crypto/validation layer).
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::AuthRequired => "authentication is required for this method",
            ErrorCode::InvalidCredentials => "invalid credentials",
            ErrorCode::InvalidName => "invalid name",
            ErrorCode::InvalidTag => "invalid tag",
            ErrorCode::InvalidSdp => "invalid sdp",
            ErrorCode::InvalidParams => "invalid params",
            ErrorCode::MissingParams => "missing params",
            ErrorCode::OfferNotFound => "offer not found",
            ErrorCode::OfferAlreadyAnswered => "offer already answered",
            ErrorCode::OfferNotAnswered => "offer not answered",
            ErrorCode::NoAvailableOffers => "no available offers",
            ErrorCode::NotAuthorized => "not authorized",
            ErrorCode::OwnershipMismatch => "ownership mismatch",
            ErrorCode::TooManyOffers => "too many offers",
            ErrorCode::SdpTooLarge => "sdp too large",
            ErrorCode::BatchTooLarge => "batch too large",
            ErrorCode::RateLimitExceeded => "rate limit exceeded",
            ErrorCode::TooManyOffersPerUser => "too many offers for this user",
            ErrorCode::StorageFull => "storage is full",
            ErrorCode::TooManyIceCandidates => "too many ice candidates",
            ErrorCode::InternalError => "internal error",
            ErrorCode::UnknownMethod => "unknown method",
        }
    }
}

/// An `{errorCode, error}` pair, as delivered in a failed response slot.
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    #[serde(rename = "errorCode")]
    pub code: ErrorCode,
    pub error: String,
}

impl RpcError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            error: code.default_message().to_string(),
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            error: message.into(),
        }
    }
}

impl From<ErrorCode> for RpcError {
    fn from(code: ErrorCode) -> Self {
        RpcError::new(code)
    }
}
