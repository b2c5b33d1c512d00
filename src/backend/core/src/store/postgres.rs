//! PostgreSQL job store.
//!
//! Jobs live in `travel_details`. The terminal update is a single guarded
//! `UPDATE ... WHERE status = 'pending'`, so row-level locking gives both the
//! at-most-once transition and whole-record visibility.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::JobStore;
use crate::config::DatabaseConfig;
use crate::error::{ErrorCode, Result, WaypointError};
use crate::jobs::{Job, JobOutcome, JobStatus, Token};

/// Job store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a new connection pool.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Run embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO travel_details
                (token, path, status, total_distance, total_time, response_error, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job.token.0)
        .bind(&job.path)
        .bind(job.status.as_str())
        .bind(to_db_int(job.total_distance)?)
        .bind(to_db_int(job.total_time)?)
        .bind(job.error_message.as_deref().unwrap_or(""))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, token: Token, outcome: &JobOutcome) -> Result<()> {
        let (total_distance, total_time, response_error) = match outcome {
            JobOutcome::Success {
                total_distance,
                total_time,
            } => (to_db_int(*total_distance)?, to_db_int(*total_time)?, ""),
            JobOutcome::Failure { error } => (0, 0, error.as_str()),
        };

        let result = sqlx::query(
            r#"
            UPDATE travel_details
            SET status = $2,
                total_distance = $3,
                total_time = $4,
                response_error = $5,
                updated_at = NOW()
            WHERE token = $1 AND status = 'pending'
            "#,
        )
        .bind(token.0)
        .bind(outcome.status().as_str())
        .bind(total_distance)
        .bind(total_time)
        .bind(response_error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing matched: either the token is unknown or the job is already terminal
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM travel_details WHERE token = $1")
                .bind(token.0)
                .fetch_optional(&self.pool)
                .await?;

        match current {
            None => Err(WaypointError::not_found("Job", token.to_string())),
            Some(status) => Err(WaypointError::with_internal(
                ErrorCode::InvalidStateTransition,
                "Job already completed",
                format!("job {} is {}", token, status),
            )
            .with_context("token", token.to_string())),
        }
    }

    async fn get(&self, token: Token) -> Result<Job> {
        let row = sqlx::query_as::<_, TravelDetailsRow>(
            r#"
            SELECT token, path, status, total_distance, total_time, response_error,
                   created_at, updated_at
            FROM travel_details
            WHERE token = $1
            "#,
        )
        .bind(token.0)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| WaypointError::not_found("Job", token.to_string()))?
            .try_into()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Row Types
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
pub struct TravelDetailsRow {
    pub token: Uuid,
    pub path: String,
    pub status: String,
    pub total_distance: i64,
    pub total_time: i64,
    pub response_error: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TravelDetailsRow> for Job {
    type Error = WaypointError;

    fn try_from(row: TravelDetailsRow) -> Result<Self> {
        let status: JobStatus = row.status.parse()?;
        let error_message = match status {
            JobStatus::Failure => Some(row.response_error),
            JobStatus::Pending | JobStatus::Success => None,
        };

        Ok(Job {
            token: Token(row.token),
            path: row.path,
            status,
            total_distance: from_db_int(row.total_distance)?,
            total_time: from_db_int(row.total_time)?,
            error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_db_int(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| WaypointError::internal(format!("value {} exceeds BIGINT range", value)))
}

fn from_db_int(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| WaypointError::decode(format!("negative total {} in travel_details", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> TravelDetailsRow {
        TravelDetailsRow {
            token: Uuid::new_v4(),
            path: r#"[["1","1"],["2","2"]]"#.to_string(),
            status: status.to_string(),
            total_distance: 3000,
            total_time: 180,
            response_error: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_to_job() {
        let job = Job::try_from(row("success")).unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert_eq!(job.total_distance, 3000);
        assert_eq!(job.total_time, 180);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_failure_row_keeps_error() {
        let mut failed = row("failure");
        failed.response_error = "NOT_FOUND".to_string();
        let job = Job::try_from(failed).unwrap();
        assert_eq!(job.error_message.as_deref(), Some("NOT_FOUND"));
    }

    #[test]
    fn test_bad_status_is_decode_error() {
        let err = Job::try_from(row("finished")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DeserializationError);
    }

    #[test]
    fn test_negative_total_is_rejected() {
        let mut bad = row("success");
        bad.total_time = -1;
        assert!(Job::try_from(bad).is_err());
    }
}
