// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde_json::Value;

use crate::crypto::error::CryptoError;

/// `name` must be 3-32 chars of `[a-z0-9._-]`.
pub fn validate_name(name: &str) -> Result<(), CryptoError> {
    let len = name.len();
    if !(3..=32).contains(&len) {
        return Err(CryptoError::InvalidName);
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'))
    {
        return Err(CryptoError::InvalidName);
    }
    Ok(())
}

/// A tag is a non-empty, printable token with no spaces or control
/// characters.
pub fn validate_tag(tag: &str) -> Result<(), CryptoError> {
    if tag.is_empty() {
        return Err(CryptoError::InvalidTag);
    }
    if tag
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || !c.is_ascii_graphic())
    {
        return Err(CryptoError::InvalidTag);
    }
    Ok(())
}

/// `sdp` must be a non-empty string of at most `max` bytes. Oversize is
/// reported distinctly from empty/malformed so callers can map it to the
/// dedicated limits error code rather than the validation one.
pub fn validate_sdp(sdp: &str, max: usize) -> Result<(), CryptoError> {
    if sdp.is_empty() {
        return Err(CryptoError::InvalidSdp);
    }
    if sdp.len() > max {
        return Err(CryptoError::SdpTooLarge { max });
    }
    Ok(())
}

/// Checks a candidate's JSON nesting depth iteratively with an explicit
/// stack, so adversarial nesting cannot blow the call stack. Depth is
/// counted at entry (when a container is pushed), not at the leaf, per the
/// "checks depth at entry, not at leaf" requirement: a container that would
/// exceed `max_depth` fails before any of its children are visited.
pub fn validate_candidate_depth(candidate: &Value, max_depth: usize) -> Result<(), CryptoError> {
    let mut stack: Vec<(&Value, usize)> = vec![(candidate, 1)];
    while let Some((value, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(CryptoError::CandidateTooDeep { max: max_depth });
        }
        match value {
            Value::Object(map) => {
                for child in map.values() {
                    stack.push((child, depth + 1));
                }
            },
            Value::Array(items) => {
                for child in items {
                    stack.push((child, depth + 1));
                }
            },
            _ => {},
        }
    }
    Ok(())
}

/// Checks a candidate's serialized size against `max_size` bytes.
pub fn validate_candidate_size(candidate: &Value, max_size: usize) -> Result<(), CryptoError> {
    let serialized = serde_json::to_vec(candidate).unwrap_or_default();
    if serialized.len() > max_size {
        return Err(CryptoError::CandidateTooLarge { max: max_size });
    }
    Ok(())
}
