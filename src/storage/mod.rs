//! Abstract interface over offers, ICE candidates, credentials, rate-limit
//! counters and nonces. Backends differ in dialect only — semantics are
//! identical across implementations.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod memory;
pub mod models;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use self::models::{AnswerOutcome, Credential, IceCandidate, Offer, Role};

/// Batched join input/output cap for [`Storage::get_ice_candidates_for_multiple_offers`].
pub const MAX_OFFER_IDS_PER_JOIN: usize = 1000;

/// The storage contract. One in-memory backend
/// ([`memory::MemoryStorage`]) ships with this crate; SQL backends are a
/// pure implementation-detail addition that this crate does not carry (see
/// `STORAGE_TYPE` in the configuration surface).
///
/// All timestamps are caller-supplied epoch milliseconds — the contract
/// never reads the wall clock itself, so a single "now" observed by the
/// dispatcher is consistent across every storage call in one request.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts every offer in `batch`. Duplicates on `id` (SHA-256 of SDP)
    /// are idempotent — the existing row wins and is returned in its place.
    /// Transactional across the batch: a failure partway through leaves no
    /// partial offers.
    async fn create_offers(&self, batch: Vec<Offer>) -> Result<Vec<Offer>>;

    /// Returns the row iff it exists and `expires_at > now`.
    async fn get_offer_by_id(&self, id: &str, now: i64) -> Result<Option<Offer>>;

    /// Deletes iff `owner` matches the stored `username`. Returns whether a
    /// row was removed.
    async fn delete_offer(&self, id: &str, owner: &str) -> Result<bool>;

    /// Conditional update: sets `answerer`/`answer_sdp`/`answered_at` only
    /// where `answerer_username` is still unset.
    #[allow(clippy::too_many_arguments)]
    async fn answer_offer(
        &self,
        id: &str,
        answerer: &str,
        sdp: &str,
        matched_tags: Option<Vec<String>>,
        new_expires_at: Option<i64>,
        now: i64,
    ) -> Result<AnswerOutcome>;

    /// OR-match across `tags`, excluding `exclude_user` and already-answered
    /// or expired offers. Deterministic order: `created_at DESC`. Returns
    /// the requested page plus the total matching count.
    async fn discover_offers(
        &self,
        tags: &[String],
        exclude_user: Option<&str>,
        limit: usize,
        offset: usize,
        now: i64,
    ) -> Result<(Vec<Offer>, usize)>;

    /// Same filter as [`Storage::discover_offers`], single uniform-random
    /// row.
    async fn get_random_offer(
        &self,
        tags: &[String],
        exclude_user: Option<&str>,
        now: i64,
    ) -> Result<Option<Offer>>;

    /// Atomic append; candidates are assigned `created_at = base, base+1,
    /// ..., base+n-1` so a single batch yields a strictly increasing
    /// sequence.
    async fn add_ice_candidates(
        &self,
        offer_id: &str,
        user: &str,
        role: Role,
        candidates: Vec<serde_json::Value>,
        base_time: i64,
    ) -> Result<Vec<IceCandidate>>;

    /// Candidates posted under `target_role`, strictly `> since`, ascending
    /// by `created_at`.
    async fn get_ice_candidates(
        &self,
        offer_id: &str,
        target_role: Role,
        since: i64,
    ) -> Result<Vec<IceCandidate>>;

    /// Batched join over `offer_ids` (hard-capped at
    /// [`MAX_OFFER_IDS_PER_JOIN`]), returning only the candidates posted by
    /// the role *opposite* `user` on each offer — the central
    /// confidentiality invariant, enforced once here instead of per-offer
    /// N+1 calls.
    async fn get_ice_candidates_for_multiple_offers(
        &self,
        offer_ids: &[String],
        user: &str,
        since: i64,
    ) -> Result<HashMap<String, Vec<IceCandidate>>>;

    /// Offers where `username` is involved as offerer or answerer and that
    /// are not expired. Feeds the batched join above for `poll`.
    async fn get_offers_for_participant(&self, username: &str, now: i64) -> Result<Vec<Offer>>;

    /// Offers owned by `username` that have been answered with
    /// `answered_at > since`.
    async fn get_answered_offers_by_username(
        &self,
        username: &str,
        since: i64,
    ) -> Result<Vec<Offer>>;

    /// Atomic upsert: resets to 1 if `reset_time < now`, otherwise
    /// increments. Returns whether the post-increment count is `<= limit`.
    async fn check_rate_limit(
        &self,
        identifier: &str,
        limit: u64,
        window_ms: i64,
        now: i64,
    ) -> Result<bool>;

    /// Insert-once; returns `true` iff newly inserted (a `false` return
    /// means replay).
    async fn check_and_mark_nonce(&self, key: &str, expires_at: i64) -> Result<bool>;

    async fn get_offer_count(&self, now: i64) -> Result<usize>;
    async fn get_offer_count_by_username(&self, username: &str, now: i64) -> Result<usize>;
    async fn get_ice_candidate_count(&self, offer_id: &str) -> Result<usize>;
    async fn get_credential_count(&self) -> Result<usize>;

    /// Inserts a new credential. Returns `false` on a name collision
    /// without mutating anything.
    async fn create_credential(&self, credential: Credential) -> Result<bool>;
    async fn get_credential(&self, name: &str) -> Result<Option<Credential>>;
    /// Sets `last_used = now`, `expires_at = new_expires_at`.
    async fn touch_credential(&self, name: &str, now: i64, new_expires_at: i64) -> Result<()>;

    /// TTL sweeps used by the cleanup scheduler. Return the number of rows
    /// removed.
    async fn delete_expired_offers(&self, now: i64) -> Result<usize>;
    async fn delete_expired_credentials(&self, now: i64) -> Result<usize>;
    async fn delete_expired_nonces(&self, now: i64) -> Result<usize>;
}
