//! In-memory [`Store`] implementation.
//!
//! Backs unit tests and `serve` runs without a database.  A single `RwLock`
//! over the whole state keeps every operation atomic, mirroring the
//! single-row guarantees of the Postgres store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    ExecutionPatch, ExecutionRow, ExecutionStatus, JobRow, JobStatus, UsageRow, WorkflowRow,
};
use crate::{Store, StoreError};

#[derive(Default)]
struct Inner {
    workflows: HashMap<Uuid, WorkflowRow>,
    executions: HashMap<Uuid, ExecutionRow>,
    /// Insertion-ordered so `pending_jobs` preserves enqueue order.
    jobs: Vec<JobRow>,
    usage: Vec<UsageRow>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all usage rows, for assertions in tests.
    pub fn usage_rows(&self) -> Vec<UsageRow> {
        self.inner.read().expect("store lock poisoned").usage.clone()
    }

    /// Snapshot of all job rows, for assertions in tests.
    pub fn job_rows(&self) -> Vec<JobRow> {
        self.inner.read().expect("store lock poisoned").jobs.clone()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("store lock poisoned")
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("store lock poisoned")
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_workflow(
        &self,
        name: &str,
        user_id: Uuid,
        is_public: bool,
        definition: serde_json::Value,
    ) -> Result<WorkflowRow, StoreError> {
        let row = WorkflowRow {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            user_id,
            is_public,
            definition,
            created_at: Utc::now(),
        };
        self.write().workflows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_workflow(&self, id: Uuid) -> Result<WorkflowRow, StoreError> {
        self.read()
            .workflows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_workflows(&self, user_id: Option<Uuid>) -> Result<Vec<WorkflowRow>, StoreError> {
        let mut rows: Vec<WorkflowRow> = self
            .read()
            .workflows
            .values()
            .filter(|w| match user_id {
                Some(uid) => w.user_id == uid || w.is_public,
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn delete_workflow(&self, id: Uuid) -> Result<(), StoreError> {
        self.write()
            .workflows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn create_execution(
        &self,
        workflow_id: Uuid,
        user_id: Uuid,
        input: serde_json::Value,
    ) -> Result<ExecutionRow, StoreError> {
        let row = ExecutionRow {
            id: Uuid::new_v4(),
            workflow_id,
            user_id,
            status: ExecutionStatus::Pending.to_string(),
            input,
            output: None,
            logs: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.write().executions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_execution(&self, id: Uuid) -> Result<ExecutionRow, StoreError> {
        self.read()
            .executions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_execution(&self, id: Uuid, patch: ExecutionPatch) -> Result<(), StoreError> {
        let mut inner = self.write();
        let row = inner.executions.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(status) = patch.status {
            row.status = status.to_string();
        }
        if let Some(output) = patch.output {
            row.output = Some(output);
        }
        if let Some(logs) = patch.logs {
            row.logs = Some(logs);
        }
        if let Some(error) = patch.error {
            row.error = Some(error);
        }
        if let Some(completed_at) = patch.completed_at {
            row.completed_at = Some(completed_at);
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
        let now = Utc::now();
        let row = JobRow {
            id,
            execution_id,
            workflow_id,
            user_id,
            status: JobStatus::Pending.to_string(),
            payload,
            created_at: now,
            updated_at: now,
        };
        self.write().jobs.push(row.clone());
        Ok(row)
    }

    async fn update_job_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        let mut inner = self.write();
        let row = inner
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(StoreError::NotFound)?;
        row.status = status.to_string();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn pending_jobs(&self) -> Result<Vec<JobRow>, StoreError> {
        Ok(self
            .read()
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Pending.to_string())
            .cloned()
            .collect())
    }

    async fn append_usage(
        &self,
        user_id: Uuid,
        action: &str,
        tokens: i64,
        cost: f64,
    ) -> Result<UsageRow, StoreError> {
        let row = UsageRow {
            id: Uuid::new_v4(),
            user_id,
            action: action.to_owned(),
            tokens,
            cost,
            created_at: Utc::now(),
        };
        self.write().usage.push(row.clone());
        Ok(row)
    }
}
