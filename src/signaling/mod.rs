//! `publishOffer`, `discover`, `answerOffer`, `getOfferAnswer`,
//! `addIceCandidates`, `getIceCandidates`, `poll`, `deleteOffer`. One
//! function per method, each taking `&dyn Storage` plus typed params and
//! returning a typed JSON result or an [`ErrorCode`], with no session or
//! connection state to thread through between calls.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::{
    cfg::config::Config,
    crypto::{error::CryptoError, hash::offer_id, validate},
    rpc::{
        error::ErrorCode,
        methods::{
            AddIceCandidatesParams, AnswerOfferParams, DeleteOfferParams, DiscoverParams,
            GetIceCandidatesParams, GetOfferAnswerParams, PollParams, PublishOfferParams,
        },
    },
    storage::{
        MAX_OFFER_IDS_PER_JOIN, Storage,
        models::{AnswerOutcome, Offer, Role},
    },
};

fn internal_error<E: std::fmt::Display>(context: &str, err: E) -> ErrorCode {
    tracing::error!(context, %err, "storage call failed");
    ErrorCode::InternalError
}

/// Maps [`validate::validate_sdp`]'s failure modes onto their distinct
/// error codes: empty/malformed is a validation error, oversize is a
/// limits error.
fn sdp_error_code(err: CryptoError) -> ErrorCode {
    match err {
        CryptoError::SdpTooLarge { .. } => ErrorCode::SdpTooLarge,
        _ => ErrorCode::InvalidSdp,
    }
}

#[derive(Debug, Serialize)]
pub struct PublishedOffer {
    #[serde(rename = "offerId")]
    pub offer_id: String,
    pub sdp: String,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct PublishOfferResult {
    pub username: String,
    pub tags: Vec<String>,
    pub offers: Vec<PublishedOffer>,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

/// `publishOffer(tags, offers, ttl?)` — admission-checked, idempotent on
/// SDP hash, all offers in the call share one `expiresAt`.
pub async fn publish_offer(
    storage: &dyn Storage,
    cfg: &Config,
    username: &str,
    params: PublishOfferParams,
    now: i64,
) -> Result<Value, ErrorCode> {
    if params.offers.is_empty() || params.offers.len() > cfg.max_offers_per_request {
        return Err(ErrorCode::TooManyOffers);
    }
    for tag in &params.tags {
        validate::validate_tag(tag).map_err(|_| ErrorCode::InvalidTag)?;
    }
    for offer in &params.offers {
        validate::validate_sdp(&offer.sdp, cfg.max_sdp_size).map_err(sdp_error_code)?;
    }

    let per_user = storage
        .get_offer_count_by_username(username, now)
        .await
        .map_err(|e| internal_error("get_offer_count_by_username", e))?;
    if per_user + params.offers.len() > cfg.max_offers_per_user {
        return Err(ErrorCode::TooManyOffersPerUser);
    }
    let total = storage
        .get_offer_count(now)
        .await
        .map_err(|e| internal_error("get_offer_count", e))?;
    if total + params.offers.len() > cfg.max_total_offers {
        return Err(ErrorCode::StorageFull);
    }

    let ttl = params
        .ttl
        .unwrap_or(cfg.offer_default_ttl_ms)
        .clamp(cfg.offer_min_ttl_ms, cfg.offer_max_ttl_ms);
    let expires_at = now + ttl;

    let batch: Vec<Offer> = params
        .offers
        .iter()
        .map(|o| Offer {
            id: offer_id(&o.sdp),
            username: username.to_string(),
            tags: params.tags.clone(),
            sdp: o.sdp.clone(),
            created_at: now,
            expires_at,
            last_seen: now,
            answerer_username: None,
            answer_sdp: None,
            answered_at: None,
            matched_tags: None,
        })
        .collect();

    let created = storage
        .create_offers(batch)
        .await
        .map_err(|e| internal_error("create_offers", e))?;

    let result = PublishOfferResult {
        username: username.to_string(),
        tags: params.tags,
        offers: created
            .iter()
            .map(|o| PublishedOffer {
                offer_id: o.id.clone(),
                sdp: o.sdp.clone(),
                created_at: o.created_at,
                expires_at: o.expires_at,
            })
            .collect(),
        created_at: now,
        expires_at,
    };
    Ok(serde_json::to_value(result).expect("PublishOfferResult always serializes"))
}

#[derive(Debug, Serialize)]
pub struct DiscoveredOffer {
    #[serde(rename = "offerId")]
    pub offer_id: String,
    pub username: String,
    pub tags: Vec<String>,
    pub sdp: String,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

impl From<&Offer> for DiscoveredOffer {
    fn from(o: &Offer) -> Self {
        DiscoveredOffer {
            offer_id: o.id.clone(),
            username: o.username.clone(),
            tags: o.tags.clone(),
            sdp: o.sdp.clone(),
            created_at: o.created_at,
            expires_at: o.expires_at,
        }
    }
}

/// Upper bound on a paginated `discover` page.
pub const MAX_PAGE_SIZE: usize = 100;

/// `discover(tags, limit?, offset?)` — public. Paginated when `limit` is
/// present, otherwise a single uniform-random offer.
pub async fn discover(
    storage: &dyn Storage,
    caller: Option<&str>,
    params: DiscoverParams,
    now: i64,
) -> Result<Value, ErrorCode> {
    for tag in &params.tags {
        validate::validate_tag(tag).map_err(|_| ErrorCode::InvalidTag)?;
    }

    match params.limit {
        Some(limit) => {
            if limit == 0 {
                return Err(ErrorCode::InvalidParams);
            }
            let limit = limit.min(MAX_PAGE_SIZE);
            let offset = params.offset.unwrap_or(0);
            let (offers, count) = storage
                .discover_offers(&params.tags, caller, limit, offset, now)
                .await
                .map_err(|e| internal_error("discover_offers", e))?;
            Ok(serde_json::json!({
                "offers": offers.iter().map(DiscoveredOffer::from).collect::<Vec<_>>(),
                "count": count,
                "limit": limit,
                "offset": offset,
            }))
        },
        None => {
            let offer = storage
                .get_random_offer(&params.tags, caller, now)
                .await
                .map_err(|e| internal_error("get_random_offer", e))?
                .ok_or(ErrorCode::OfferNotFound)?;
            Ok(serde_json::to_value(DiscoveredOffer::from(&offer))
                .expect("DiscoveredOffer always serializes"))
        },
    }
}

/// `answerOffer(offerId, sdp, matchedTags?)`.
pub async fn answer_offer(
    storage: &dyn Storage,
    cfg: &Config,
    username: &str,
    params: AnswerOfferParams,
    now: i64,
) -> Result<Value, ErrorCode> {
    validate::validate_sdp(&params.sdp, cfg.max_sdp_size).map_err(sdp_error_code)?;

    let offer = storage
        .get_offer_by_id(&params.offer_id, now)
        .await
        .map_err(|e| internal_error("get_offer_by_id", e))?
        .ok_or(ErrorCode::OfferNotFound)?;
    if offer.is_answered() {
        return Err(ErrorCode::OfferAlreadyAnswered);
    }

    if let Some(matched) = &params.matched_tags {
        let offending: Vec<&String> = matched.iter().filter(|t| !offer.tags.contains(t)).collect();
        if !offending.is_empty() {
            return Err(ErrorCode::InvalidTag);
        }
    }

    let outcome = storage
        .answer_offer(
            &params.offer_id,
            username,
            &params.sdp,
            params.matched_tags,
            None,
            now,
        )
        .await
        .map_err(|e| internal_error("answer_offer", e))?;

    match outcome {
        AnswerOutcome::Success => Ok(serde_json::json!({"success": true})),
        // A lost race is reported identically to an already-answered offer.
        AnswerOutcome::AlreadyAnswered => Err(ErrorCode::OfferAlreadyAnswered),
        AnswerOutcome::NotFoundOrExpired => Err(ErrorCode::OfferNotFound),
    }
}

/// `getOfferAnswer(offerId)` — ownership-gated on the offerer.
pub async fn get_offer_answer(
    storage: &dyn Storage,
    username: &str,
    params: GetOfferAnswerParams,
    now: i64,
) -> Result<Value, ErrorCode> {
    let offer = storage
        .get_offer_by_id(&params.offer_id, now)
        .await
        .map_err(|e| internal_error("get_offer_by_id", e))?
        .ok_or(ErrorCode::OfferNotFound)?;
    if offer.username != username {
        return Err(ErrorCode::NotAuthorized);
    }
    let (answerer, sdp, answered_at) = match (
        offer.answerer_username,
        offer.answer_sdp,
        offer.answered_at,
    ) {
        (Some(a), Some(s), Some(t)) => (a, s, t),
        _ => return Err(ErrorCode::OfferNotAnswered),
    };
    Ok(serde_json::json!({
        "offerId": params.offer_id,
        "answererUsername": answerer,
        "sdp": sdp,
        "answeredAt": answered_at,
        "matchedTags": offer.matched_tags,
    }))
}

/// `addIceCandidates(offerId, candidates)`. Role is assigned by the server —
/// the caller cannot claim to be the opposite side of its own offer.
pub async fn add_ice_candidates(
    storage: &dyn Storage,
    cfg: &Config,
    username: &str,
    params: AddIceCandidatesParams,
    now: i64,
) -> Result<Value, ErrorCode> {
    if params.candidates.is_empty() || params.candidates.len() > cfg.max_candidates_per_request {
        return Err(ErrorCode::TooManyIceCandidates);
    }
    for candidate in &params.candidates {
        validate::validate_candidate_depth(candidate, cfg.max_candidate_depth)
            .map_err(|_| ErrorCode::InvalidParams)?;
        validate::validate_candidate_size(candidate, cfg.max_candidate_size)
            .map_err(|_| ErrorCode::InvalidParams)?;
    }

    let offer = storage
        .get_offer_by_id(&params.offer_id, now)
        .await
        .map_err(|e| internal_error("get_offer_by_id", e))?
        .ok_or(ErrorCode::OfferNotFound)?;
    let role = if offer.username == username {
        Role::Offerer
    } else {
        Role::Answerer
    };

    let current = storage
        .get_ice_candidate_count(&params.offer_id)
        .await
        .map_err(|e| internal_error("get_ice_candidate_count", e))?;
    if current + params.candidates.len() > cfg.max_ice_candidates_per_offer {
        return Err(ErrorCode::TooManyIceCandidates);
    }

    let inserted = storage
        .add_ice_candidates(&params.offer_id, username, role, params.candidates, now)
        .await
        .map_err(|e| internal_error("add_ice_candidates", e))?;

    Ok(serde_json::json!({
        "offerId": params.offer_id,
        "added": inserted.len(),
    }))
}

/// `getIceCandidates(offerId, since?)` — the caller must be a participant;
/// the response never includes the caller's own candidates.
pub async fn get_ice_candidates(
    storage: &dyn Storage,
    username: &str,
    params: GetIceCandidatesParams,
    now: i64,
) -> Result<Value, ErrorCode> {
    let offer = storage
        .get_offer_by_id(&params.offer_id, now)
        .await
        .map_err(|e| internal_error("get_offer_by_id", e))?
        .ok_or(ErrorCode::OfferNotFound)?;
    let caller_role = offer.role_of(username).ok_or(ErrorCode::NotAuthorized)?;

    let since = params.since.unwrap_or(0);
    let rows = storage
        .get_ice_candidates(&params.offer_id, caller_role.opposite(), since)
        .await
        .map_err(|e| internal_error("get_ice_candidates", e))?;

    Ok(serde_json::json!({
        "offerId": params.offer_id,
        "candidates": rows.iter().map(|c| serde_json::json!({
            "id": c.id,
            "candidate": c.candidate,
            "createdAt": c.created_at,
        })).collect::<Vec<_>>(),
    }))
}

/// `poll(since?)` — answers for the caller's own offers plus the
/// opposite-role ICE candidates on every offer the caller participates in,
/// delivered via one batched join rather than N+1 per-offer calls.
pub async fn poll(storage: &dyn Storage, username: &str, params: PollParams, now: i64) -> Result<Value, ErrorCode> {
    let since = params.since.unwrap_or(0);

    let answered = storage
        .get_answered_offers_by_username(username, since)
        .await
        .map_err(|e| internal_error("get_answered_offers_by_username", e))?;

    let participant_offers = storage
        .get_offers_for_participant(username, now)
        .await
        .map_err(|e| internal_error("get_offers_for_participant", e))?;
    let offer_ids: Vec<String> = participant_offers
        .iter()
        .take(MAX_OFFER_IDS_PER_JOIN)
        .map(|o| o.id.clone())
        .collect();
    let candidates_by_offer: HashMap<String, Vec<_>> = storage
        .get_ice_candidates_for_multiple_offers(&offer_ids, username, since)
        .await
        .map_err(|e| internal_error("get_ice_candidates_for_multiple_offers", e))?;

    let answers: Vec<Value> = answered
        .iter()
        .map(|o| {
            serde_json::json!({
                "offerId": o.id,
                "answererUsername": o.answerer_username,
                "sdp": o.answer_sdp,
                "answeredAt": o.answered_at,
            })
        })
        .collect();

    let ice_candidates: HashMap<String, Vec<Value>> = candidates_by_offer
        .into_iter()
        .map(|(offer_id, rows)| {
            let rows = rows
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id,
                        "candidate": c.candidate,
                        "createdAt": c.created_at,
                    })
                })
                .collect();
            (offer_id, rows)
        })
        .collect();

    Ok(serde_json::json!({
        "answers": answers,
        "iceCandidates": ice_candidates,
    }))
}

/// `deleteOffer(offerId)` — owner-only.
pub async fn delete_offer(
    storage: &dyn Storage,
    username: &str,
    params: DeleteOfferParams,
    _now: i64,
) -> Result<Value, ErrorCode> {
    let removed = storage
        .delete_offer(&params.offer_id, username)
        .await
        .map_err(|e| internal_error("delete_offer", e))?;
    if removed {
        Ok(serde_json::json!({"success": true}))
    } else {
        Err(ErrorCode::NotAuthorized)
    }
}
