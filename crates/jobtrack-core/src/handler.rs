// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job handler contract and kind registry.
//!
//! Every job kind implements [`JobHandler`]; the engine resolves handlers
//! through a [`HandlerRegistry`] built once at startup. Handlers run on pool
//! workers with no ambient request context - everything they need is passed
//! explicitly through the [`JobContext`] and the request payload.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TrackerError;

/// Execution context for one job, passed explicitly to `process`.
///
/// Carries the identifiers a handler needs for logging and for calls into
/// collaborator services. Handlers must not assume any thread-local request
/// state exists on the worker.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Owner the job belongs to.
    pub owner_id: String,
    /// Tracker id of this job instance.
    pub tracker_id: String,
    /// Job kind being executed.
    pub kind: String,
}

/// Contract implemented by every job kind.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Stable identifier for this job kind. Used to route requests, to
    /// partition the dedup cache, and as the record lookup filter.
    fn kind(&self) -> &str;

    /// Execute the job body.
    ///
    /// Runs on a pool worker, never on the caller's task. Any error is
    /// captured by the engine into the record's terminal `error` state;
    /// handlers fail with [`crate::JobFailure`] when the recorded error code
    /// matters, or any `anyhow::Error` otherwise.
    async fn process(
        &self,
        ctx: &JobContext,
        request: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value>;
}

/// Registry mapping job kind to its handler, resolved once at startup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its kind.
    ///
    /// Registering two handlers for the same kind is a configuration error
    /// and fails fast rather than silently replacing the first.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) -> Result<(), TrackerError> {
        let kind = handler.kind().to_string();
        if self.handlers.contains_key(&kind) {
            return Err(TrackerError::DuplicateKind { kind });
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    /// Resolve the handler for `kind`, if one is registered.
    pub fn resolve(&self, kind: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(kind).cloned()
    }

    /// The kinds registered, for startup logging.
    pub fn kinds(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
