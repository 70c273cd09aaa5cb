//! SQLite-backed tracker store implementation.

use std::path::Path;

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::TrackerError;
use crate::status::TrackerStatus;

use super::{ListFilter, NewTrackerRecord, TrackerRecord, TrackerStore};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

/// SQLite-backed tracker store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from an existing pool.
    ///
    /// The caller is responsible for running migrations on the pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a new SQLite store from a file path.
    ///
    /// This convenience constructor handles all setup:
    /// - Creates parent directories if they don't exist
    /// - Creates the database file if it doesn't exist
    /// - Connects to the database with sensible defaults
    /// - Runs all migrations
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file (e.g., ".data/jobtrack.db")
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = SqliteStore::from_path(".data/jobtrack.db").await?;
    /// ```
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TrackerError::DatabaseError {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        // Build connection URL
        let path_str = path.to_string_lossy();
        let url = format!("sqlite:{}?mode=rwc", path_str);

        // Create pool with reasonable defaults
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| TrackerError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {:?}: {}", path, e),
            })?;

        // Run migrations
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| TrackerError::DatabaseError {
                operation: "migrate".to_string(),
                details: format!("Failed to run migrations: {}", e),
            })?;

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl TrackerStore for SqliteStore {
    async fn insert_record(&self, new: &NewTrackerRecord) -> Result<String, TrackerError> {
        let tracker_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO tracker_records (tracker_id, owner_id, kind, status, request_payload, created_at)
            VALUES (?1, ?2, ?3, 'processing', ?4, ?5)
            "#,
        )
        .bind(&tracker_id)
        .bind(&new.owner_id)
        .bind(&new.kind)
        .bind(Json(&new.request_payload))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(tracker_id)
    }

    async fn find_record(
        &self,
        tracker_id: &str,
        owner_id: &str,
        kind: &str,
    ) -> Result<Option<TrackerRecord>, TrackerError> {
        let record = sqlx::query_as::<_, TrackerRecord>(
            r#"
            SELECT tracker_id, owner_id, kind, status,
                   request_payload, response_payload, created_at, finished_at
            FROM tracker_records
            WHERE tracker_id = ?1 AND owner_id = ?2 AND kind = ?3
            "#,
        )
        .bind(tracker_id)
        .bind(owner_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn complete_record(
        &self,
        tracker_id: &str,
        owner_id: &str,
        status: TrackerStatus,
        response_payload: &serde_json::Value,
    ) -> Result<bool, TrackerError> {
        // Guarded terminal update: applies only while still processing, so a
        // record never transitions twice.
        let result = sqlx::query(
            r#"
            UPDATE tracker_records
            SET status = ?1,
                response_payload = ?2,
                finished_at = ?3
            WHERE tracker_id = ?4 AND owner_id = ?5 AND status = 'processing'
            "#,
        )
        .bind(status.as_str())
        .bind(Json(response_payload))
        .bind(Utc::now())
        .bind(tracker_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_record(&self, tracker_id: &str) -> Result<(), TrackerError> {
        sqlx::query(
            r#"
            DELETE FROM tracker_records
            WHERE tracker_id = ?1
            "#,
        )
        .bind(tracker_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_records(
        &self,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TrackerRecord>, TrackerError> {
        let records = sqlx::query_as::<_, TrackerRecord>(
            r#"
            SELECT tracker_id, owner_id, kind, status,
                   request_payload, response_payload, created_at, finished_at
            FROM tracker_records
            WHERE (?1 IS NULL OR owner_id = ?1)
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR status = ?3)
            ORDER BY created_at DESC
            LIMIT ?4 OFFSET ?5
            "#,
        )
        .bind(filter.owner_id.as_deref())
        .bind(filter.kind.as_deref())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn count_processing(&self) -> Result<i64, TrackerError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tracker_records WHERE status = 'processing'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn health_check(&self) -> Result<bool, TrackerError> {
        let result: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(result == 1)
    }
}
