// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Jobtrack Core - Asynchronous Job Tracking Engine
//!
//! This crate provides an in-process engine for tracking long-running jobs.
//! A caller enqueues a job for an owner and immediately receives a tracker id;
//! the job body runs on a bounded worker pool while the caller polls for the
//! terminal result. All job state is persisted through a pluggable store so
//! results survive the request that created them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Calling Code                              │
//! │              (HTTP resource layer, CLI, embedding app)           │
//! └──────────────────────────────────────────────────────────────────┘
//!        │ queue(owner, kind, payload)          │ get_result(...)
//!        ▼                                      ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       TrackerEngine                              │
//! │                                                                  │
//! │  ┌────────────────┐   ┌──────────────────┐   ┌───────────────┐  │
//! │  │  DedupCache    │   │ HandlerRegistry  │   │  WorkerPool   │  │
//! │  │ (owner, kind)  │   │ kind → handler   │   │ bounded queue │  │
//! │  │ → tracker id   │   │                  │   │ + N permits   │  │
//! │  └────────────────┘   └──────────────────┘   └───────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//! ┌──────────────────────────┐
//! │   TrackerStore (trait)   │
//! │  PostgresStore / Sqlite  │
//! └──────────────────────────┘
//! ```
//!
//! # Tracker Status State Machine
//!
//! ```text
//!              ┌────────────┐
//!              │ PROCESSING │
//!              └─────┬──────┘
//!                    │
//!         ┌──────────┴──────────┐
//!    process ok             process err
//!         │                     │
//!         ▼                     ▼
//!     ┌──────┐             ┌───────┐
//!     │ DONE │             │ ERROR │
//!     └──────┘             └───────┘
//! ```
//!
//! | Status | Description |
//! |--------|-------------|
//! | `processing` | Record inserted, job queued or executing |
//! | `done` | Handler returned a response payload |
//! | `error` | Handler failed; response payload holds a structured code + message |
//!
//! `done` and `error` are terminal. The store enforces this: the terminal
//! update only applies while the record is still `processing`, so a record
//! never transitions twice and never moves backwards.
//!
//! # Enqueue Semantics
//!
//! `queue` collapses concurrent identical requests: while a job for the same
//! `(owner, kind)` is in flight and its dedup-cache entry has not expired,
//! repeated calls return the existing tracker id instead of creating new
//! records. This is a process-local optimization, not a distributed lock -
//! two racing callers can still both insert records, and a second engine
//! instance knows nothing about the first.
//!
//! If the worker pool rejects a submission (queue full or shutting down) the
//! freshly inserted record and cache entry are rolled back and `queue`
//! returns a retryable error. This is the only failure `queue` surfaces;
//! handler failures are captured into the record's terminal `error` state
//! and never reach the enqueueing caller.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `JOBTRACK_DATABASE_URL` | Yes | - | PostgreSQL or SQLite connection string |
//! | `JOBTRACK_WORKERS` | No | `8` | Worker pool concurrency |
//! | `JOBTRACK_QUEUE_DEPTH` | No | `64` | Bounded submission queue depth |
//! | `JOBTRACK_DEDUP_TTL_SECS` | No | `600` | Dedup cache entry lifetime |
//!
//! # Modules
//!
//! - [`config`]: Engine configuration from environment variables
//! - [`dedup`]: Time-bounded deduplication cache
//! - [`engine`]: The tracker engine - enqueue, execution, polling
//! - [`error`]: Error types with stable error-code mapping
//! - [`handler`]: The `JobHandler` contract and kind registry
//! - [`persistence`]: `TrackerStore` trait and the Postgres/SQLite backends
//! - [`pool`]: Bounded worker pool
//! - [`status`]: Tracker status state machine

#![deny(missing_docs)]

/// Engine configuration loaded from environment variables.
pub mod config;

/// Time-bounded deduplication cache keyed by `(owner, kind)`.
pub mod dedup;

/// The tracker engine: enqueue, job execution, result polling.
pub mod engine;

/// Error types for tracker operations with stable error-code mapping.
pub mod error;

/// Job handler contract and the kind registry.
pub mod handler;

/// Persistence interface and database backends for tracker records.
pub mod persistence;

/// Bounded worker pool executing job bodies.
pub mod pool;

/// Tracker record status state machine.
pub mod status;

pub use engine::{EngineHealth, TrackerEngine, TrackerEngineBuilder};
pub use error::{ErrorDetail, JobFailure, TrackerError};
pub use handler::{JobContext, JobHandler};
pub use persistence::{NewTrackerRecord, TrackerRecord, TrackerStore};
pub use status::TrackerStatus;
