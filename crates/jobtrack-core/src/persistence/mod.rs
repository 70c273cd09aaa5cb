//! Persistence interfaces and backends for jobtrack-core.
//!
//! This module defines the tracker-record store abstraction and the database
//! backend implementations.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ErrorDetail, TrackerError};
use crate::status::TrackerStatus;

/// Tracker record from the persistence layer.
///
/// One row per queued job. The record is inserted with status `processing`
/// and mutated exactly once by the terminal update; the store keeps terminal
/// records for later polling.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackerRecord {
    /// Unique identifier, assigned by the store at insert time.
    pub tracker_id: String,
    /// Owner (tenant/account) the job belongs to.
    pub owner_id: String,
    /// Job kind that produced this record.
    pub kind: String,
    /// Current status (processing, done, error).
    pub status: String,
    /// The request payload the job was queued with.
    pub request_payload: serde_json::Value,
    /// Terminal payload: the handler response for `done`, an
    /// [`ErrorDetail`] for `error`, absent while `processing`.
    pub response_payload: Option<serde_json::Value>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record reached its terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl TrackerRecord {
    /// Parsed status, if the stored string is a known status.
    pub fn tracker_status(&self) -> Option<TrackerStatus> {
        TrackerStatus::parse(&self.status)
    }

    /// Whether the record has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.tracker_status().is_some_and(|s| s.is_terminal())
    }

    /// The structured error payload, for records in `error` status.
    pub fn error_detail(&self) -> Option<ErrorDetail> {
        if self.tracker_status() != Some(TrackerStatus::Error) {
            return None;
        }
        self.response_payload
            .as_ref()
            .and_then(|payload| serde_json::from_value(payload.clone()).ok())
    }
}

/// A new tracker record to insert. The store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewTrackerRecord {
    /// Owner the job belongs to.
    pub owner_id: String,
    /// Job kind handling the request.
    pub kind: String,
    /// The request payload being queued.
    pub request_payload: serde_json::Value,
}

/// Filter options for listing tracker records.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Filter by owner id.
    pub owner_id: Option<String>,
    /// Filter by job kind.
    pub kind: Option<String>,
    /// Filter by status.
    pub status: Option<TrackerStatus>,
}

/// Persistence interface used by the tracker engine.
///
/// Implementations must support safe concurrent updates scoped by
/// `(tracker_id, owner_id)`; the engine calls them from request tasks and
/// pool workers simultaneously.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Insert a new record with status `processing` and return its id.
    async fn insert_record(&self, new: &NewTrackerRecord) -> Result<String, TrackerError>;

    /// Point lookup by the full `(tracker_id, owner_id, kind)` tuple.
    async fn find_record(
        &self,
        tracker_id: &str,
        owner_id: &str,
        kind: &str,
    ) -> Result<Option<TrackerRecord>, TrackerError>;

    /// Apply the terminal update: set status and response payload, stamp
    /// `finished_at`.
    ///
    /// The update only applies while the record is still `processing`.
    /// Returns true if it was applied, false if the record was already
    /// terminal (or missing) - this is what keeps terminal records immutable
    /// under racing completions.
    async fn complete_record(
        &self,
        tracker_id: &str,
        owner_id: &str,
        status: TrackerStatus,
        response_payload: &serde_json::Value,
    ) -> Result<bool, TrackerError>;

    /// Delete a record by id. Used only to roll back a failed enqueue.
    async fn delete_record(&self, tracker_id: &str) -> Result<(), TrackerError>;

    /// List records matching the filter, newest first.
    async fn list_records(
        &self,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TrackerRecord>, TrackerError>;

    /// Count records still in `processing` status.
    async fn count_processing(&self) -> Result<i64, TrackerError>;

    /// Check that the backing database is reachable.
    async fn health_check(&self) -> Result<bool, TrackerError>;
}
