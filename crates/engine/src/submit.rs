//! The execution submission service — the only entry point external
//! callers use to start a run.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use store::{ExecutionRow, JobStatus, Store};

use crate::models::{Job, Workflow};
use crate::validate::validate_steps;
use crate::EngineError;

pub struct Submitter {
    store: Arc<dyn Store>,
    producer: queue::Producer<Job>,
}

impl Submitter {
    pub fn new(store: Arc<dyn Store>, producer: queue::Producer<Job>) -> Self {
        Self { store, producer }
    }

    /// Create an execution for `workflow_id` and enqueue its job.
    ///
    /// Non-blocking with respect to step execution: the returned row is in
    /// `PENDING` and callers poll it for progress.  Creation and enqueue
    /// are not transactional; the job journal narrows the crash window by
    /// letting [`Submitter::recover`] re-enqueue journalled jobs.
    ///
    /// # Errors
    /// `StoreError::NotFound` (wrapped) when the workflow does not exist —
    /// the one failure surfaced synchronously to the caller.
    pub async fn submit(
        &self,
        workflow_id: Uuid,
        user_id: Uuid,
        input: Value,
    ) -> Result<ExecutionRow, EngineError> {
        let row = self.store.get_workflow(workflow_id).await?;
        let workflow = Workflow::from_row(&row)?;

        // Stored definitions are validated at save time; re-check here so a
        // row written by an older or foreign writer cannot reach a worker.
        validate_steps(&workflow.definition.steps)?;

        let execution = self
            .store
            .create_execution(workflow_id, user_id, input.clone())
            .await?;

        let job = Job {
            id: Uuid::new_v4(),
            execution_id: execution.id,
            workflow_id,
            user_id,
            steps: workflow.definition.steps,
            input,
        };

        let payload = serde_json::to_value(&job)?;
        self.store
            .create_job(job.id, job.execution_id, workflow_id, user_id, payload)
            .await?;

        self.producer
            .send(job)
            .map_err(|_| EngineError::QueueClosed)?;

        info!(
            execution_id = %execution.id,
            workflow_id = %workflow_id,
            "execution submitted"
        );
        Ok(execution)
    }

    /// Re-enqueue journalled jobs that never reached a worker (still
    /// `pending` after a restart).  Returns how many were re-enqueued.
    pub async fn recover(&self) -> Result<usize, EngineError> {
        let rows = self.store.pending_jobs().await?;
        let mut recovered = 0usize;

        for row in rows {
            match serde_json::from_value::<Job>(row.payload.clone()) {
                Ok(job) => {
                    self.producer
                        .send(job)
                        .map_err(|_| EngineError::QueueClosed)?;
                    recovered += 1;
                }
                Err(err) => {
                    warn!(job_id = %row.id, "dropping unreadable job payload: {err}");
                    self.store
                        .update_job_status(row.id, JobStatus::Failed)
                        .await?;
                }
            }
        }

        if recovered > 0 {
            info!(recovered, "re-enqueued journalled jobs");
        }
        Ok(recovered)
    }
}
