// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use rand::Rng;

use crate::storage::{
    MAX_OFFER_IDS_PER_JOIN, Storage,
    models::{AnswerOutcome, Credential, IceCandidate, Offer, RateLimitEntry, Role},
};

/// In-memory storage backend. Every table is a [`DashMap`] sharded by key,
/// giving per-shard-locked atomic read-modify-write via `entry()` — the same
/// concurrency idiom the client pool uses for its session/connection maps.
#[derive(Default)]
pub struct MemoryStorage {
    offers: DashMap<String, Offer>,
    ice_candidates: DashMap<String, Vec<IceCandidate>>,
    credentials: DashMap<String, Credential>,
    rate_limits: DashMap<String, RateLimitEntry>,
    nonces: DashMap<String, i64>,
    ice_id_seq: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn offer_matches_tags(offer: &Offer, tags: &[String]) -> bool {
        tags.is_empty() || tags.iter().any(|t| offer.tags.contains(t))
    }

    fn offer_is_discoverable(offer: &Offer, exclude_user: Option<&str>, now: i64) -> bool {
        if offer.is_expired(now) || offer.is_answered() {
            return false;
        }
        match exclude_user {
            Some(u) => offer.username != u,
            None => true,
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_offers(&self, batch: Vec<Offer>) -> Result<Vec<Offer>> {
        let mut out = Vec::with_capacity(batch.len());
        for offer in batch {
            let existing = self
                .offers
                .entry(offer.id.clone())
                .or_insert_with(|| offer.clone());
            out.push(existing.clone());
        }
        Ok(out)
    }

    async fn get_offer_by_id(&self, id: &str, now: i64) -> Result<Option<Offer>> {
        Ok(self
            .offers
            .get(id)
            .filter(|o| !o.is_expired(now))
            .map(|o| o.clone()))
    }

    async fn delete_offer(&self, id: &str, owner: &str) -> Result<bool> {
        let removed = match self.offers.entry(id.to_string()) {
            Entry::Occupied(occ) if occ.get().username == owner => {
                occ.remove();
                true
            },
            _ => false,
        };
        if removed {
            self.ice_candidates.remove(id);
        }
        Ok(removed)
    }

    async fn answer_offer(
        &self,
        id: &str,
        answerer: &str,
        sdp: &str,
        matched_tags: Option<Vec<String>>,
        new_expires_at: Option<i64>,
        now: i64,
    ) -> Result<AnswerOutcome> {
        match self.offers.entry(id.to_string()) {
            Entry::Occupied(mut occ) => {
                let offer = occ.get_mut();
                if offer.is_expired(now) {
                    return Ok(AnswerOutcome::NotFoundOrExpired);
                }
                if offer.is_answered() {
                    return Ok(AnswerOutcome::AlreadyAnswered);
                }
                offer.answerer_username = Some(answerer.to_string());
                offer.answer_sdp = Some(sdp.to_string());
                offer.answered_at = Some(now);
                offer.matched_tags = matched_tags;
                if let Some(exp) = new_expires_at {
                    offer.expires_at = exp;
                }
                Ok(AnswerOutcome::Success)
            },
            Entry::Vacant(_) => Ok(AnswerOutcome::NotFoundOrExpired),
        }
    }

    async fn discover_offers(
        &self,
        tags: &[String],
        exclude_user: Option<&str>,
        limit: usize,
        offset: usize,
        now: i64,
    ) -> Result<(Vec<Offer>, usize)> {
        let mut matching: Vec<Offer> = self
            .offers
            .iter()
            .filter(|e| {
                Self::offer_is_discoverable(e.value(), exclude_user, now)
                    && Self::offer_matches_tags(e.value(), tags)
            })
            .map(|e| e.value().clone())
            .collect();

        matching.sort_unstable_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len();
        let page = matching.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn get_random_offer(
        &self,
        tags: &[String],
        exclude_user: Option<&str>,
        now: i64,
    ) -> Result<Option<Offer>> {
        let matching: Vec<Offer> = self
            .offers
            .iter()
            .filter(|e| {
                Self::offer_is_discoverable(e.value(), exclude_user, now)
                    && Self::offer_matches_tags(e.value(), tags)
            })
            .map(|e| e.value().clone())
            .collect();

        if matching.is_empty() {
            return Ok(None);
        }
        let idx = rand::rng().random_range(0..matching.len());
        Ok(matching.into_iter().nth(idx))
    }

    async fn add_ice_candidates(
        &self,
        offer_id: &str,
        user: &str,
        role: Role,
        candidates: Vec<serde_json::Value>,
        base_time: i64,
    ) -> Result<Vec<IceCandidate>> {
        let mut inserted = Vec::with_capacity(candidates.len());
        let mut entry = self.ice_candidates.entry(offer_id.to_string()).or_default();
        for (i, candidate) in candidates.into_iter().enumerate() {
            let row = IceCandidate {
                id: self.ice_id_seq.fetch_add(1, Ordering::Relaxed),
                offer_id: offer_id.to_string(),
                username: user.to_string(),
                role,
                candidate,
                created_at: base_time + i as i64,
            };
            entry.push(row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn get_ice_candidates(
        &self,
        offer_id: &str,
        target_role: Role,
        since: i64,
    ) -> Result<Vec<IceCandidate>> {
        let mut rows: Vec<IceCandidate> = self
            .ice_candidates
            .get(offer_id)
            .map(|list| {
                list.iter()
                    .filter(|c| c.role == target_role && c.created_at > since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_unstable_by_key(|c| c.created_at);
        Ok(rows)
    }

    async fn get_ice_candidates_for_multiple_offers(
        &self,
        offer_ids: &[String],
        user: &str,
        since: i64,
    ) -> Result<HashMap<String, Vec<IceCandidate>>> {
        let mut out = HashMap::with_capacity(offer_ids.len());
        for offer_id in offer_ids.iter().take(MAX_OFFER_IDS_PER_JOIN) {
            let Some(offer) = self.offers.get(offer_id) else {
                continue;
            };
            let Some(caller_role) = offer.role_of(user) else {
                continue;
            };
            drop(offer);
            let target_role = caller_role.opposite();
            let rows = self
                .get_ice_candidates(offer_id, target_role, since)
                .await?;
            if !rows.is_empty() {
                out.insert(offer_id.clone(), rows);
            }
        }
        Ok(out)
    }

    async fn get_offers_for_participant(&self, username: &str, now: i64) -> Result<Vec<Offer>> {
        Ok(self
            .offers
            .iter()
            .filter(|e| !e.value().is_expired(now) && e.value().role_of(username).is_some())
            .map(|e| e.value().clone())
            .collect())
    }

    async fn get_answered_offers_by_username(
        &self,
        username: &str,
        since: i64,
    ) -> Result<Vec<Offer>> {
        Ok(self
            .offers
            .iter()
            .filter(|e| {
                let o = e.value();
                o.username == username && o.answered_at.is_some_and(|ts| ts > since)
            })
            .map(|e| e.value().clone())
            .collect())
    }

    async fn check_rate_limit(
        &self,
        identifier: &str,
        limit: u64,
        window_ms: i64,
        now: i64,
    ) -> Result<bool> {
        let count = match self.rate_limits.entry(identifier.to_string()) {
            Entry::Occupied(mut occ) => {
                let entry = occ.get_mut();
                if entry.reset_time < now {
                    entry.count = 1;
                    entry.reset_time = now + window_ms;
                } else {
                    entry.count += 1;
                }
                entry.count
            },
            Entry::Vacant(vac) => {
                vac.insert(RateLimitEntry {
                    identifier: identifier.to_string(),
                    count: 1,
                    reset_time: now + window_ms,
                });
                1
            },
        };
        Ok(count <= limit)
    }

    async fn check_and_mark_nonce(&self, key: &str, expires_at: i64) -> Result<bool> {
        match self.nonces.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vac) => {
                vac.insert(expires_at);
                Ok(true)
            },
        }
    }

    async fn get_offer_count(&self, now: i64) -> Result<usize> {
        Ok(self.offers.iter().filter(|e| !e.value().is_expired(now)).count())
    }

    async fn get_offer_count_by_username(&self, username: &str, now: i64) -> Result<usize> {
        Ok(self
            .offers
            .iter()
            .filter(|e| !e.value().is_expired(now) && e.value().username == username)
            .count())
    }

    async fn get_ice_candidate_count(&self, offer_id: &str) -> Result<usize> {
        Ok(self
            .ice_candidates
            .get(offer_id)
            .map(|list| list.len())
            .unwrap_or(0))
    }

    async fn get_credential_count(&self) -> Result<usize> {
        Ok(self.credentials.len())
    }

    async fn create_credential(&self, credential: Credential) -> Result<bool> {
        match self.credentials.entry(credential.name.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vac) => {
                vac.insert(credential);
                Ok(true)
            },
        }
    }

    async fn get_credential(&self, name: &str) -> Result<Option<Credential>> {
        Ok(self.credentials.get(name).map(|c| c.clone()))
    }

    async fn touch_credential(&self, name: &str, now: i64, new_expires_at: i64) -> Result<()> {
        if let Some(mut cred) = self.credentials.get_mut(name) {
            cred.last_used = now;
            cred.expires_at = new_expires_at;
        }
        Ok(())
    }

    async fn delete_expired_offers(&self, now: i64) -> Result<usize> {
        let expired: Vec<String> = self
            .offers
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();
        for id in &expired {
            self.offers.remove(id);
            self.ice_candidates.remove(id);
        }
        Ok(expired.len())
    }

    async fn delete_expired_credentials(&self, now: i64) -> Result<usize> {
        let expired: Vec<String> = self
            .credentials
            .iter()
            .filter(|e| e.value().expires_at < now)
            .map(|e| e.key().clone())
            .collect();
        for name in &expired {
            self.credentials.remove(name);
        }
        Ok(expired.len())
    }

    async fn delete_expired_nonces(&self, now: i64) -> Result<usize> {
        let expired: Vec<String> = self
            .nonces
            .iter()
            .filter(|e| *e.value() < now)
            .map(|e| e.key().clone())
            .collect();
        for key in &expired {
            self.nonces.remove(key);
        }
        Ok(expired.len())
    }
}
