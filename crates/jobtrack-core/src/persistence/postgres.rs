//! PostgreSQL-backed tracker store implementation.

use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::TrackerError;
use crate::status::TrackerStatus;

use super::{ListFilter, NewTrackerRecord, TrackerRecord, TrackerStore};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/postgres");

/// PostgreSQL-backed tracker store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from an existing pool.
    ///
    /// The caller is responsible for running migrations on the pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to PostgreSQL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, TrackerError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| TrackerError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to connect to PostgreSQL: {}", e),
            })?;

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
impl TrackerStore for PostgresStore {
    async fn insert_record(&self, new: &NewTrackerRecord) -> Result<String, TrackerError> {
        let tracker_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO tracker_records (tracker_id, owner_id, kind, status, request_payload, created_at)
            VALUES ($1, $2, $3, 'processing', $4, $5)
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
            WHERE tracker_id = $1 AND owner_id = $2 AND kind = $3
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
            SET status = $1,
                response_payload = $2,
                finished_at = $3
            WHERE tracker_id = $4 AND owner_id = $5 AND status = 'processing'
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
            WHERE tracker_id = $1
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
            WHERE ($1::text IS NULL OR owner_id = $1)
              AND ($2::text IS NULL OR kind = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
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
