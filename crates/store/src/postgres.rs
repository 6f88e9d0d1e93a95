//! Postgres [`Store`] implementation.
//!
//! Queries use the runtime-checked sqlx API so the crate builds without a
//! live database.  Every operation is a single statement; the partial
//! execution update folds its optional fields through `COALESCE` so one
//! statement covers every patch shape.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    ExecutionPatch, ExecutionRow, ExecutionStatus, JobRow, JobStatus, UsageRow, WorkflowRow,
};
use crate::{Store, StoreError};

/// Shared Postgres pool type used across the application.
pub type DbPool = sqlx::PgPool;

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connect a fresh pool; `max_connections` caps it.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        info!(max_connections, "connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded migrations from `./migrations` (workspace root).
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_workflow(
        &self,
        name: &str,
        user_id: Uuid,
        is_public: bool,
        definition: serde_json::Value,
    ) -> Result<WorkflowRow, StoreError> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            INSERT INTO workflows (id, name, user_id, is_public, definition, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, user_id, is_public, definition, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(user_id)
        .bind(is_public)
        .bind(definition)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_workflow(&self, id: Uuid) -> Result<WorkflowRow, StoreError> {
        sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, name, user_id, is_public, definition, created_at
            FROM workflows WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn list_workflows(&self, user_id: Option<Uuid>) -> Result<Vec<WorkflowRow>, StoreError> {
        let rows = match user_id {
            Some(uid) => {
                sqlx::query_as::<_, WorkflowRow>(
                    r#"
                    SELECT id, name, user_id, is_public, definition, created_at
                    FROM workflows
                    WHERE user_id = $1 OR is_public
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(uid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, WorkflowRow>(
                    r#"
                    SELECT id, name, user_id, is_public, definition, created_at
                    FROM workflows ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    async fn delete_workflow(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_execution(
        &self,
        workflow_id: Uuid,
        user_id: Uuid,
        input: serde_json::Value,
    ) -> Result<ExecutionRow, StoreError> {
        let row = sqlx::query_as::<_, ExecutionRow>(
            r#"
            INSERT INTO executions (id, workflow_id, user_id, status, input, started_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, workflow_id, user_id, status, input, output, logs, error,
                      started_at, completed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workflow_id)
        .bind(user_id)
        .bind(ExecutionStatus::Pending.to_string())
        .bind(input)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_execution(&self, id: Uuid) -> Result<ExecutionRow, StoreError> {
        sqlx::query_as::<_, ExecutionRow>(
            r#"
            SELECT id, workflow_id, user_id, status, input, output, logs, error,
                   started_at, completed_at
            FROM executions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn update_execution(&self, id: Uuid, patch: ExecutionPatch) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE executions SET
                status       = COALESCE($2, status),
                output       = COALESCE($3, output),
                logs         = COALESCE($4, logs),
                error        = COALESCE($5, error),
                completed_at = COALESCE($6, completed_at)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.to_string()))
        .bind(patch.output)
        .bind(patch.logs)
        .bind(patch.error)
        .bind(patch.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_job(
        &self,
        id: Uuid,
        execution_id: Uuid,
        workflow_id: Uuid,
        user_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<JobRow, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (id, execution_id, workflow_id, user_id, status, payload,
                              created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id, execution_id, workflow_id, user_id, status, payload,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(execution_id)
        .bind(workflow_id)
        .bind(user_id)
        .bind(JobStatus::Pending.to_string())
        .bind(payload)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_job_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE jobs SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn pending_jobs(&self) -> Result<Vec<JobRow>, StoreError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, execution_id, workflow_id, user_id, status, payload,
                   created_at, updated_at
            FROM jobs
            WHERE status = 'pending'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn append_usage(
        &self,
        user_id: Uuid,
        action: &str,
        tokens: i64,
        cost: f64,
    ) -> Result<UsageRow, StoreError> {
        let row = sqlx::query_as::<_, UsageRow>(
            r#"
            INSERT INTO usage_records (id, user_id, action, tokens, cost, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, action, tokens, cost, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(action)
        .bind(tokens)
        .bind(cost)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
