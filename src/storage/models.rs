// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

/// Which side of an offer a poster is acting as. Assigned by the server at
/// insert time — never taken from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Offerer,
    Answerer,
}

impl Role {
    /// The role that is entitled to read candidates posted as `self`.
    pub fn opposite(self) -> Role {
        match self {
            Role::Offerer => Role::Answerer,
            Role::Answerer => Role::Offerer,
        }
    }
}

/// Identity record. The plaintext secret is never stored — only
/// [`Credential::secret_encrypted`], the AES-GCM ciphertext produced by
/// [`crate::crypto::secret::encrypt_secret`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub name: String,
    pub secret_encrypted: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub last_used: i64,
}

/// An SDP posting open for at most one answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub username: String,
    pub tags: Vec<String>,
    pub sdp: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub last_seen: i64,
    pub answerer_username: Option<String>,
    pub answer_sdp: Option<String>,
    pub answered_at: Option<i64>,
    pub matched_tags: Option<Vec<String>>,
}

impl Offer {
    pub fn is_answered(&self) -> bool {
        self.answerer_username.is_some()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// The role `username` plays on this offer, if any.
    pub fn role_of(&self, username: &str) -> Option<Role> {
        if self.username == username {
            Some(Role::Offerer)
        } else if self.answerer_username.as_deref() == Some(username) {
            Some(Role::Answerer)
        } else {
            None
        }
    }
}

/// Opaque ICE blob posted by either peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceCandidate {
    pub id: u64,
    pub offer_id: String,
    pub username: String,
    pub role: Role,
    pub candidate: serde_json::Value,
    pub created_at: i64,
}

/// `{identifier, count, resetTime}` — single row per rate-limited
/// identifier.
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub identifier: String,
    pub count: u64,
    pub reset_time: i64,
}

/// Outcome of a conditional `answerOffer` update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Success,
    AlreadyAnswered,
    NotFoundOrExpired,
}
