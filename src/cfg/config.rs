// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use anyhow::{Result, ensure};
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Storage backend selection (`STORAGE_TYPE`).
///
/// Only [`StorageKind::Memory`] is implemented by this crate — the SQL
/// dialects are recognized so the environment surface documented in §6
/// stays complete, but building one of them fails fast with
/// [`ConfigError::Unimplemented`] rather than silently falling back.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Sqlite,
    Mysql,
    Postgres,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageKind::Memory => "memory",
            StorageKind::Sqlite => "sqlite",
            StorageKind::Mysql => "mysql",
            StorageKind::Postgres => "postgres",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("STORAGE_TYPE={0} is recognized but not implemented by this build")]
    Unimplemented(StorageKind),
}

/// Environment-driven configuration for the broker. Mirrors the recognized
/// option table in the external interfaces section: every key is a plain
/// environment variable, parsed and validated once at startup.
#[derive(Parser, Debug, Clone)]
#[command(name = "webrtc-signal-broker", about = "WebRTC rendezvous and signaling broker")]
pub struct Config {
    /// HTTP listen port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Selected storage backend.
    #[arg(long, env = "STORAGE_TYPE", value_enum, default_value_t = StorageKind::Memory)]
    pub storage_type: StorageKind,

    /// Filesystem path for file-backed storage (`sqlite`).
    #[arg(long, env = "STORAGE_PATH")]
    pub storage_path: Option<String>,

    /// Connection string for networked storage (`mysql`/`postgres`).
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Connection pool size for networked storage.
    #[arg(long, env = "DB_POOL_SIZE", default_value_t = 10)]
    pub db_pool_size: u32,

    /// Comma-separated list of allowed CORS origins; `*` allows any.
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// 64 hex-char (32 byte) AES-GCM key encrypting credential secrets at
    /// rest. Required unless `NODE_ENV=development`.
    #[arg(long, env = "MASTER_ENCRYPTION_KEY")]
    pub master_encryption_key: Option<String>,

    /// Deployment environment; only `development` relaxes
    /// `MASTER_ENCRYPTION_KEY`.
    #[arg(long, env = "NODE_ENV", default_value = "production")]
    pub node_env: String,

    #[arg(long, env = "OFFER_DEFAULT_TTL", default_value_t = 120_000)]
    pub offer_default_ttl_ms: i64,
    #[arg(long, env = "OFFER_MIN_TTL", default_value_t = 60_000)]
    pub offer_min_ttl_ms: i64,
    #[arg(long, env = "OFFER_MAX_TTL", default_value_t = 3_600_000)]
    pub offer_max_ttl_ms: i64,

    /// Milliseconds between TTL sweeps of the cleanup scheduler.
    #[arg(long, env = "CLEANUP_INTERVAL", default_value_t = 60_000)]
    pub cleanup_interval_ms: u64,

    #[arg(long, env = "MAX_OFFERS_PER_REQUEST", default_value_t = 100)]
    pub max_offers_per_request: usize,
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = 50)]
    pub max_batch_size: usize,
    #[arg(long, env = "MAX_TOTAL_OPERATIONS", default_value_t = 1000)]
    pub max_total_operations: usize,

    #[arg(long, env = "MAX_SDP_SIZE", default_value_t = 10_000)]
    pub max_sdp_size: usize,
    #[arg(long, env = "MAX_CANDIDATE_SIZE", default_value_t = 2_000)]
    pub max_candidate_size: usize,
    #[arg(long, env = "MAX_CANDIDATE_DEPTH", default_value_t = 10)]
    pub max_candidate_depth: usize,
    #[arg(long, env = "MAX_CANDIDATES_PER_REQUEST", default_value_t = 50)]
    pub max_candidates_per_request: usize,

    /// Auth timestamp window, past direction, milliseconds.
    #[arg(long, env = "TIMESTAMP_MAX_AGE", default_value_t = 60_000)]
    pub timestamp_max_age_ms: i64,
    /// Auth timestamp window, future direction, milliseconds.
    #[arg(long, env = "TIMESTAMP_MAX_FUTURE", default_value_t = 60_000)]
    pub timestamp_max_future_ms: i64,

    #[arg(long, env = "MAX_OFFERS_PER_USER", default_value_t = 1000)]
    pub max_offers_per_user: usize,
    #[arg(long, env = "MAX_TOTAL_OFFERS", default_value_t = 100_000)]
    pub max_total_offers: usize,
    #[arg(long, env = "MAX_TOTAL_CREDENTIALS", default_value_t = 100_000)]
    pub max_total_credentials: usize,
    #[arg(long, env = "MAX_ICE_CANDIDATES_PER_OFFER", default_value_t = 500)]
    pub max_ice_candidates_per_offer: usize,

    #[arg(long, env = "CREDENTIALS_PER_IP_PER_SECOND", default_value_t = 1)]
    pub credentials_per_ip_per_second: u32,
    #[arg(long, env = "REQUESTS_PER_IP_PER_SECOND", default_value_t = 20)]
    pub requests_per_ip_per_second: u32,
}

/// Fixed key used only when `NODE_ENV=development` and no key is set.
/// Never use in a reachable deployment — logged loudly on every startup.
const INSECURE_DEV_MASTER_KEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

impl Config {
    /// Parses from `std::env`/CLI args and validates. The binary entry point
    /// calls this once at startup.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Config::parse();
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and fills in derived/defaulted fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            self.offer_min_ttl_ms <= self.offer_default_ttl_ms,
            "OFFER_MIN_TTL must be <= OFFER_DEFAULT_TTL"
        );
        ensure!(
            self.offer_default_ttl_ms <= self.offer_max_ttl_ms,
            "OFFER_DEFAULT_TTL must be <= OFFER_MAX_TTL"
        );
        ensure!(self.max_batch_size >= 1, "MAX_BATCH_SIZE must be >= 1");
        ensure!(
            self.max_total_operations >= 1,
            "MAX_TOTAL_OPERATIONS must be >= 1"
        );
        ensure!(
            self.max_candidate_depth >= 1,
            "MAX_CANDIDATE_DEPTH must be >= 1"
        );

        if self.master_encryption_key.is_none() {
            ensure!(
                self.node_env == "development",
                "MASTER_ENCRYPTION_KEY is required unless NODE_ENV=development"
            );
            tracing::warn!(
                "MASTER_ENCRYPTION_KEY not set; falling back to the insecure \
                 development key because NODE_ENV=development. Never use this \
                 outside local development."
            );
            self.master_encryption_key = Some(INSECURE_DEV_MASTER_KEY[..64].to_string());
        } else if let Some(key) = &self.master_encryption_key {
            ensure!(
                key.len() == 64 && key.bytes().all(|b| b.is_ascii_hexdigit()),
                "MASTER_ENCRYPTION_KEY must be 64 hex characters"
            );
        }

        Ok(())
    }

    /// Parsed list of allowed CORS origins (`*` kept as a single wildcard
    /// entry).
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Decoded 32-byte master key, after [`Config::validate_and_normalize`]
    /// has guaranteed it is present and well-formed.
    pub fn master_key_bytes(&self) -> Result<[u8; 32]> {
        let hex_str = self
            .master_encryption_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("MASTER_ENCRYPTION_KEY missing after validation"))?;
        let bytes = hex::decode(hex_str)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("MASTER_ENCRYPTION_KEY must decode to 32 bytes"))?;
        Ok(arr)
    }
}

impl StorageKind {
    pub fn require_implemented(self) -> Result<(), ConfigError> {
        match self {
            StorageKind::Memory => Ok(()),
            other => Err(ConfigError::Unimplemented(other)),
        }
    }
}
