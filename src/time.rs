// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The single source of "now" for the engine. Every storage call and crypto
//! check takes its timestamp from here (or from a value threaded through
//! from here) rather than reading the wall clock itself, so one observed
//! instant is consistent across every operation in a batch.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// 365 days in milliseconds — the credential TTL refreshed on every
/// successful authenticated call.
pub const CREDENTIAL_TTL_MS: i64 = 365 * 24 * 60 * 60 * 1000;
