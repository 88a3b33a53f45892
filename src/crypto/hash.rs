// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use sha2::{Digest, Sha256};

/// An offer's `id` is a pure function of its SDP: SHA-256 of the UTF-8 bytes,
/// hex-encoded. Two offers with byte-identical SDP therefore collide on
/// `id`, which is what makes `publishOffer` idempotent on re-submission.
pub fn offer_id(sdp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sdp.as_bytes());
    hex::encode(hasher.finalize())
}
