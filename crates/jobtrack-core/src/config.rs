// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::time::Duration;

/// Jobtrack engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL or SQLite connection URL
    pub database_url: String,
    /// Worker pool concurrency
    pub workers: usize,
    /// Bounded submission queue depth
    pub queue_depth: usize,
    /// Dedup cache entry lifetime
    pub dedup_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `JOBTRACK_DATABASE_URL`: PostgreSQL or SQLite connection string
    ///
    /// Optional (with defaults):
    /// - `JOBTRACK_WORKERS`: Worker pool concurrency (default: 8)
    /// - `JOBTRACK_QUEUE_DEPTH`: Submission queue depth (default: 64)
    /// - `JOBTRACK_DEDUP_TTL_SECS`: Dedup cache TTL in seconds (default: 600)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("JOBTRACK_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("JOBTRACK_DATABASE_URL"))?;

        let workers: usize = std::env::var("JOBTRACK_WORKERS")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("JOBTRACK_WORKERS", "must be a positive integer"))?;
        if workers == 0 {
            return Err(ConfigError::Invalid(
                "JOBTRACK_WORKERS",
                "must be a positive integer",
            ));
        }

        let queue_depth: usize = std::env::var("JOBTRACK_QUEUE_DEPTH")
            .unwrap_or_else(|_| "64".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("JOBTRACK_QUEUE_DEPTH", "must be a positive integer")
            })?;
        if queue_depth == 0 {
            return Err(ConfigError::Invalid(
                "JOBTRACK_QUEUE_DEPTH",
                "must be a positive integer",
            ));
        }

        let dedup_ttl_secs: u64 = std::env::var("JOBTRACK_DEDUP_TTL_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("JOBTRACK_DEDUP_TTL_SECS", "must be a positive integer")
            })?;

        Ok(Self {
            database_url,
            workers,
            queue_depth,
            dedup_ttl: Duration::from_secs(dedup_ttl_secs),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
