// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The tracker engine: enqueue, job execution, result polling.
//!
//! One [`TrackerEngine`] owns one worker pool, one dedup cache, and one
//! handler registry; construct it with [`TrackerEngineBuilder`] and share it
//! explicitly (there is no global instance).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jobtrack_core::engine::TrackerEngine;
//! use jobtrack_core::persistence::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteStore::from_path(".data/jobtrack.db").await?);
//!
//!     let engine = TrackerEngine::builder()
//!         .store(store)
//!         .handler(Arc::new(MyHandler))
//!         .build()?
//!         .start();
//!
//!     let tracker_id = engine.queue("acct1", "my-kind", serde_json::json!({})).await?;
//!     // ... poll engine.get_result("acct1", "my-kind", &tracker_id) ...
//!
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, info, instrument, warn};

use crate::config::Config;
use crate::dedup::DedupCache;
use crate::error::{ErrorDetail, TrackerError};
use crate::handler::{HandlerRegistry, JobContext, JobHandler};
use crate::persistence::{ListFilter, NewTrackerRecord, TrackerRecord, TrackerStore};
use crate::pool::WorkerPool;
use crate::status::TrackerStatus;

const DEFAULT_WORKERS: usize = 8;
const DEFAULT_QUEUE_DEPTH: usize = 64;
const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(600);

/// Builder for creating a [`TrackerEngine`].
pub struct TrackerEngineBuilder {
    store: Option<Arc<dyn TrackerStore>>,
    handlers: Vec<Arc<dyn JobHandler>>,
    workers: usize,
    queue_depth: usize,
    dedup_ttl: Duration,
}

impl std::fmt::Debug for TrackerEngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerEngineBuilder")
            .field("store", &self.store.as_ref().map(|_| "..."))
            .field("handlers", &self.handlers.len())
            .field("workers", &self.workers)
            .field("queue_depth", &self.queue_depth)
            .field("dedup_ttl", &self.dedup_ttl)
            .finish()
    }
}

impl Default for TrackerEngineBuilder {
    fn default() -> Self {
        Self {
            store: None,
            handlers: Vec::new(),
            workers: DEFAULT_WORKERS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            dedup_ttl: DEFAULT_DEDUP_TTL,
        }
    }
}

impl TrackerEngineBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tracker store (required).
    pub fn store(mut self, store: Arc<dyn TrackerStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register a job handler. Each handler's kind must be unique.
    pub fn handler(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Set the worker pool concurrency.
    ///
    /// Default: 8
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the bounded submission queue depth.
    ///
    /// Default: 64
    pub fn queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Set the dedup cache entry lifetime.
    ///
    /// Default: 10 minutes
    pub fn dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }

    /// Apply the tunables from an environment [`Config`].
    pub fn config(mut self, config: &Config) -> Self {
        self.workers = config.workers;
        self.queue_depth = config.queue_depth;
        self.dedup_ttl = config.dedup_ttl;
        self
    }

    /// Build the engine configuration.
    ///
    /// Fails if no store was provided or if two handlers share a kind.
    pub fn build(self) -> Result<TrackerEngineConfig, TrackerError> {
        let store = self.store.ok_or_else(|| TrackerError::ValidationError {
            field: "store".to_string(),
            message: "a tracker store is required".to_string(),
        })?;

        let mut registry = HandlerRegistry::new();
        for handler in self.handlers {
            registry.register(handler)?;
        }

        Ok(TrackerEngineConfig {
            store,
            registry,
            workers: self.workers,
            queue_depth: self.queue_depth,
            dedup_ttl: self.dedup_ttl,
        })
    }
}

/// Validated configuration for a [`TrackerEngine`].
pub struct TrackerEngineConfig {
    store: Arc<dyn TrackerStore>,
    registry: HandlerRegistry,
    workers: usize,
    queue_depth: usize,
    dedup_ttl: Duration,
}

impl std::fmt::Debug for TrackerEngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerEngineConfig")
            .field("store", &"...")
            .field("registry", &self.registry)
            .field("workers", &self.workers)
            .field("queue_depth", &self.queue_depth)
            .field("dedup_ttl", &self.dedup_ttl)
            .finish()
    }
}

impl TrackerEngineConfig {
    /// Start the engine, spawning its worker pool.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(self) -> TrackerEngine {
        let pool = WorkerPool::start(self.workers, self.queue_depth);

        let engine = TrackerEngine {
            store: self.store,
            cache: Arc::new(DedupCache::new(self.dedup_ttl)),
            handlers: Arc::new(self.registry),
            pool,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        info!(
            kinds = ?engine.handlers.kinds(),
            workers = self.workers,
            "tracker engine started"
        );

        engine
    }
}

/// Engine health snapshot.
#[derive(Debug, Clone)]
pub struct EngineHealth {
    /// Whether the backing store is reachable.
    pub healthy: bool,
    /// Engine version string.
    pub version: String,
    /// Engine uptime in milliseconds.
    pub uptime_ms: i64,
    /// Number of records still in `processing` status.
    pub active_jobs: i64,
}

/// The tracker engine.
///
/// Thin orchestration over the store, dedup cache, handler registry, and
/// worker pool. Invoked from request tasks (`queue`, `get_result`) and from
/// pool workers (the completion path); all shared state is internally
/// synchronized, so callers never need external locking.
pub struct TrackerEngine {
    store: Arc<dyn TrackerStore>,
    cache: Arc<DedupCache>,
    handlers: Arc<HandlerRegistry>,
    pool: WorkerPool,
    start_time: Instant,
    version: String,
}

impl std::fmt::Debug for TrackerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerEngine")
            .field("store", &"...")
            .field("handlers", &self.handlers)
            .field("version", &self.version)
            .finish()
    }
}

impl TrackerEngine {
    /// Create a new builder for configuring the engine.
    pub fn builder() -> TrackerEngineBuilder {
        TrackerEngineBuilder::new()
    }

    /// Enqueue a job and return its tracker id without waiting for it to run.
    ///
    /// While a job for the same `(owner, kind)` is in flight and its dedup
    /// entry has not expired, the existing tracker id is returned instead of
    /// creating a new record (best-effort, process-local).
    ///
    /// # Errors
    ///
    /// Fails synchronously only when the job could not be queued at all:
    /// empty owner, unknown kind, a store insert failure, or a worker pool
    /// rejection (in which case the partial record and cache entry are
    /// rolled back and the error is retryable).
    #[instrument(skip(self, request), fields(owner_id = %owner_id, kind = %kind))]
    pub async fn queue(
        &self,
        owner_id: &str,
        kind: &str,
        request: serde_json::Value,
    ) -> Result<String, TrackerError> {
        // 1. Validate inputs and resolve the handler for this kind
        if owner_id.is_empty() {
            return Err(TrackerError::ValidationError {
                field: "owner_id".to_string(),
                message: "owner_id is required".to_string(),
            });
        }
        let handler = self
            .handlers
            .resolve(kind)
            .ok_or_else(|| TrackerError::UnknownKind {
                kind: kind.to_string(),
            })?;

        // 2. Collapse into the in-flight job if one exists
        if let Some(tracker_id) = self.cache.get(owner_id, kind) {
            debug!(tracker_id = %tracker_id, "returning in-flight tracker id");
            return Ok(tracker_id);
        }

        // 3. Insert the processing record; insert failures surface to the caller
        let tracker_id = self
            .store
            .insert_record(&NewTrackerRecord {
                owner_id: owner_id.to_string(),
                kind: kind.to_string(),
                request_payload: request.clone(),
            })
            .await?;

        // 4. Publish the in-flight id for dedup
        self.cache.put(owner_id, kind, &tracker_id);

        // 5. Hand the job body to the pool
        let ctx = JobContext {
            owner_id: owner_id.to_string(),
            tracker_id: tracker_id.clone(),
            kind: kind.to_string(),
        };
        let job = execute_job(
            self.store.clone(),
            self.cache.clone(),
            handler,
            ctx,
            request,
        );

        if let Err(rejection) = self.pool.try_submit(job) {
            // 6. Roll back the record and cache entry before surfacing the
            //    rejection, so nothing is left pointing at a job that will
            //    never run.
            self.cache.invalidate(owner_id, kind);
            if let Err(e) = self.store.delete_record(&tracker_id).await {
                warn!(
                    tracker_id = %tracker_id,
                    error = %e,
                    "failed to roll back record after pool rejection"
                );
            }
            return Err(TrackerError::QueueRejected {
                owner_id: owner_id.to_string(),
                reason: rejection.to_string(),
            });
        }

        info!(tracker_id = %tracker_id, "job queued");
        Ok(tracker_id)
    }

    /// Look up a tracker record. Pure read, no side effects.
    ///
    /// Returns `None` for an unknown or mismatched
    /// `(tracker_id, owner_id, kind)` tuple. Callers poll this until the
    /// record reaches a terminal status.
    #[instrument(skip(self))]
    pub async fn get_result(
        &self,
        owner_id: &str,
        kind: &str,
        tracker_id: &str,
    ) -> Result<Option<TrackerRecord>, TrackerError> {
        self.store.find_record(tracker_id, owner_id, kind).await
    }

    /// List tracker records matching the filter, newest first.
    pub async fn list_jobs(
        &self,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TrackerRecord>, TrackerError> {
        self.store.list_records(filter, limit, offset).await
    }

    /// Engine health: store reachability, version, uptime, active job count.
    pub async fn health(&self) -> EngineHealth {
        let healthy = self.store.health_check().await.unwrap_or(false);

        let active_jobs = if healthy {
            self.store.count_processing().await.unwrap_or(0)
        } else {
            0
        };

        EngineHealth {
            healthy,
            version: self.version.clone(),
            uptime_ms: self.start_time.elapsed().as_millis() as i64,
            active_jobs,
        }
    }

    /// Get a reference to the tracker store.
    pub fn store(&self) -> &Arc<dyn TrackerStore> {
        &self.store
    }

    /// Gracefully shut down the engine.
    ///
    /// Stops accepting submissions and waits for in-flight jobs to finish.
    /// Jobs still sitting in the submission queue are dropped; their records
    /// remain `processing` and must be resolved operationally.
    pub async fn shutdown(self) -> Result<(), TrackerError> {
        info!("tracker engine shutting down");
        self.pool
            .shutdown()
            .await
            .map_err(|e| TrackerError::ShutdownFailed {
                reason: e.to_string(),
            })?;
        info!("tracker engine shutdown complete");
        Ok(())
    }
}

/// The job body submitted to the worker pool.
///
/// Runs the handler and routes the outcome into the record's terminal state.
/// Never propagates errors: the pool task has no caller, so every failure is
/// captured into the record and logged.
async fn execute_job(
    store: Arc<dyn TrackerStore>,
    cache: Arc<DedupCache>,
    handler: Arc<dyn JobHandler>,
    ctx: JobContext,
    request: serde_json::Value,
) {
    let span = tracing::info_span!(
        "job",
        owner_id = %ctx.owner_id,
        tracker_id = %ctx.tracker_id,
        kind = %ctx.kind,
    );

    async {
        match handler.process(&ctx, request).await {
            Ok(response) => {
                finish_job(&store, &cache, &ctx, TrackerStatus::Done, response).await;
            }
            Err(err) => {
                warn!(error = %format!("{:#}", err), "job failed");
                let detail = ErrorDetail::from_job_error(&err);
                let payload = serde_json::json!({
                    "code": detail.code,
                    "message": detail.message,
                });
                finish_job(&store, &cache, &ctx, TrackerStatus::Error, payload).await;
            }
        }
    }
    .instrument(span)
    .await
}

async fn finish_job(
    store: &Arc<dyn TrackerStore>,
    cache: &Arc<DedupCache>,
    ctx: &JobContext,
    status: TrackerStatus,
    response: serde_json::Value,
) {
    // Invalidate before the terminal update so a caller that observes a
    // terminal record never gets the stale in-flight id from the cache.
    cache.invalidate(&ctx.owner_id, &ctx.kind);

    match store
        .complete_record(&ctx.tracker_id, &ctx.owner_id, status, &response)
        .await
    {
        Ok(true) => info!(status = %status, "job finished"),
        Ok(false) => warn!(status = %status, "record already terminal; result dropped"),
        Err(e) => warn!(error = %e, "failed to persist job result"),
    }
}
