//! The [`Store`] trait — every persistence operation the engine consumes.
//!
//! All operations are single-row and atomic; the engine never assumes a
//! multi-row transaction.  Implementations: [`crate::MemoryStore`] and
//! [`crate::PgStore`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{ExecutionPatch, ExecutionRow, JobRow, JobStatus, UsageRow, WorkflowRow};
use crate::StoreError;

#[async_trait]
pub trait Store: Send + Sync {
    // ------ workflows ------

    /// Insert a workflow.  `definition` is the serialised step/trigger list.
    async fn create_workflow(
        &self,
        name: &str,
        user_id: Uuid,
        is_public: bool,
        definition: serde_json::Value,
    ) -> Result<WorkflowRow, StoreError>;

    /// Fetch one workflow, or [`StoreError::NotFound`].
    async fn get_workflow(&self, id: Uuid) -> Result<WorkflowRow, StoreError>;

    /// Workflows visible to `user_id` (owned or public), newest first.
    /// With `None`, every workflow.
    async fn list_workflows(&self, user_id: Option<Uuid>) -> Result<Vec<WorkflowRow>, StoreError>;

    /// Delete a workflow, or [`StoreError::NotFound`] if no row matched.
    async fn delete_workflow(&self, id: Uuid) -> Result<(), StoreError>;

    // ------ executions ------

    /// Create an execution row in `PENDING` with `started_at` = now.
    async fn create_execution(
        &self,
        workflow_id: Uuid,
        user_id: Uuid,
        input: serde_json::Value,
    ) -> Result<ExecutionRow, StoreError>;

    /// Fetch one execution, or [`StoreError::NotFound`].
    async fn get_execution(&self, id: Uuid) -> Result<ExecutionRow, StoreError>;

    /// Apply a partial update to one execution row.
    async fn update_execution(&self, id: Uuid, patch: ExecutionPatch) -> Result<(), StoreError>;

    // ------ jobs ------

    /// Journal a queue message before it is sent.
    async fn create_job(
        &self,
        id: Uuid,
        execution_id: Uuid,
        workflow_id: Uuid,
        user_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<JobRow, StoreError>;

    /// Move a job row to a new journal status.
    async fn update_job_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError>;

    /// Jobs still `pending`, oldest first — the recovery set after a restart.
    async fn pending_jobs(&self) -> Result<Vec<JobRow>, StoreError>;

    // ------ usage ------

    /// Append one accounting record.  No read path is required by the core.
    async fn append_usage(
        &self,
        user_id: Uuid,
        action: &str,
        tokens: i64,
        cost: f64,
    ) -> Result<UsageRow, StoreError>;
}
