// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A decode-per-method dispatch table: one variant per RPC method, each
//! carrying its own strongly-typed parameter record, instead of an untyped
//! params blob threaded through every handler.

use serde::Deserialize;
use serde_json::Value;

use crate::rpc::error::ErrorCode;

/// One element of the request batch, as received off the wire — `params`
/// stays an untyped [`Value`] at this layer because it must be re-serialized
/// verbatim into the canonical signing message (see
/// [`crate::crypto::signing::canonical_message`]) before it is decoded into
/// a typed [`RpcMethod`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawRequest {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl RawRequest {
    /// The exact JSON text signed by the client: `params` re-serialized, or
    /// the literal `"{}"` when absent. Requires `serde_json`'s
    /// `preserve_order` feature so the re-serialization reproduces the
    /// client's own key order instead of sorting it.
    pub fn params_json(&self) -> String {
        match &self.params {
            Some(v) => serde_json::to_string(v).unwrap_or_else(|_| "{}".to_string()),
            None => "{}".to_string(),
        }
    }

    /// Whether this method requires an authenticated caller. Only
    /// `generateCredentials` and `discover` are public.
    pub fn requires_auth(&self) -> bool {
        !matches!(self.method.as_str(), "generateCredentials" | "discover")
    }

    /// The operation weight counted toward `MAX_TOTAL_OPERATIONS`, computed
    /// from a cheap peek at the raw params — never a full typed decode —
    /// because precounting must happen for every request in the batch
    /// before any of them are validated.
    pub fn op_weight(&self) -> usize {
        let array_len = |key: &str| -> Option<usize> {
            self.params
                .as_ref()?
                .get(key)?
                .as_array()
                .map(|a| a.len())
        };
        match self.method.as_str() {
            "publishOffer" => array_len("offers").unwrap_or(1).max(1),
            "addIceCandidates" => array_len("candidates").unwrap_or(1).max(1),
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateCredentialsParams {
    pub name: Option<String>,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverParams {
    #[serde(default)]
    pub tags: Vec<String>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferInput {
    pub sdp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishOfferParams {
    #[serde(default)]
    pub tags: Vec<String>,
    pub offers: Vec<OfferInput>,
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerOfferParams {
    #[serde(rename = "offerId")]
    pub offer_id: String,
    pub sdp: String,
    #[serde(rename = "matchedTags")]
    pub matched_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetOfferAnswerParams {
    #[serde(rename = "offerId")]
    pub offer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddIceCandidatesParams {
    #[serde(rename = "offerId")]
    pub offer_id: String,
    pub candidates: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetIceCandidatesParams {
    #[serde(rename = "offerId")]
    pub offer_id: String,
    pub since: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollParams {
    pub since: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteOfferParams {
    #[serde(rename = "offerId")]
    pub offer_id: String,
}

/// One variant per RPC method, each carrying its typed parameters.
#[derive(Debug, Clone)]
pub enum RpcMethod {
    GenerateCredentials(GenerateCredentialsParams),
    Discover(DiscoverParams),
    PublishOffer(PublishOfferParams),
    AnswerOffer(AnswerOfferParams),
    GetOfferAnswer(GetOfferAnswerParams),
    AddIceCandidates(AddIceCandidatesParams),
    GetIceCandidates(GetIceCandidatesParams),
    Poll(PollParams),
    DeleteOffer(DeleteOfferParams),
}

impl RpcMethod {
    /// Decodes `raw` into a typed method, or the `ErrorCode` to report at
    /// this request's index. Unknown method names map to
    /// [`ErrorCode::UnknownMethod`]; a present-but-malformed/absent-required
    /// `params` maps to [`ErrorCode::MissingParams`] / [`ErrorCode::InvalidParams`].
    pub fn decode(raw: &RawRequest) -> Result<RpcMethod, ErrorCode> {
        let had_params = raw.params.is_some();
        let params = raw.params.clone().unwrap_or(Value::Object(Default::default()));
        let on_decode_err = if had_params {
            ErrorCode::InvalidParams
        } else {
            ErrorCode::MissingParams
        };

        macro_rules! decode_params {
            () => {
                serde_json::from_value(params).map_err(|_| on_decode_err)?
            };
        }

        Ok(match raw.method.as_str() {
            "generateCredentials" => RpcMethod::GenerateCredentials(decode_params!()),
            "discover" => RpcMethod::Discover(decode_params!()),
            "publishOffer" => RpcMethod::PublishOffer(decode_params!()),
            "answerOffer" => RpcMethod::AnswerOffer(decode_params!()),
            "getOfferAnswer" => RpcMethod::GetOfferAnswer(decode_params!()),
            "addIceCandidates" => RpcMethod::AddIceCandidates(decode_params!()),
            "getIceCandidates" => RpcMethod::GetIceCandidates(decode_params!()),
            "poll" => RpcMethod::Poll(decode_params!()),
            "deleteOffer" => RpcMethod::DeleteOffer(decode_params!()),
            _ => return Err(ErrorCode::UnknownMethod),
        })
    }
}
