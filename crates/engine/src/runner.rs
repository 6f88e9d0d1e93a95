//! The execution state machine.
//!
//! One [`ExecutionRunner::run`] call drives one job from `PENDING` to a
//! terminal state:
//! 1. Marks the execution `RUNNING` (the first externally visible
//!    mutation), then seeds the context accumulator from the job input.
//! 2. Iterates the snapshot's steps in declared order — declared
//!    dependencies never reorder or parallelise anything.
//! 3. Resolves each step's handler, interpolates its configuration against
//!    the accumulated context, invokes the handler, and logs the outcome.
//! 4. Fail-fast: the first failing step aborts the rest; already-applied
//!    side effects are not rolled back.
//! 5. Applies exactly one terminal mutation (`COMPLETED` or `FAILED`).
//!
//! Step failures are captured into the execution row rather than returned:
//! callers observe them by polling the row, and the returned
//! `ExecutionStatus` only tells the worker how to mark the job journal.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, instrument};

use steps::{Context, HandlerRegistry, StepAction, StepContext};
use store::{ExecutionPatch, ExecutionStatus, Store};

use crate::models::{Job, StepLog};
use crate::notify::{ExecutionEvent, Notifier};
use crate::template::interpolate_value;
use crate::EngineError;

pub struct ExecutionRunner {
    store: Arc<dyn Store>,
    registry: HandlerRegistry,
    notifier: Arc<dyn Notifier>,
}

impl ExecutionRunner {
    pub fn new(store: Arc<dyn Store>, registry: HandlerRegistry, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            registry,
            notifier,
        }
    }

    /// Run one job to a terminal state.
    ///
    /// # Errors
    /// Returns `EngineError` only for infrastructure problems (storage
    /// writes on the happy path, malformed snapshots).  A failing *step*
    /// resolves to `Ok(ExecutionStatus::Failed)` with the detail captured
    /// in the execution row.
    #[instrument(skip(self, job), fields(execution_id = %job.execution_id, workflow_id = %job.workflow_id))]
    pub async fn run(&self, job: &Job) -> Result<ExecutionStatus, EngineError> {
        self.store
            .update_execution(
                job.execution_id,
                ExecutionPatch {
                    status: Some(ExecutionStatus::Running),
                    ..Default::default()
                },
            )
            .await?;
        self.notify(job, ExecutionStatus::Running, None).await;

        let mut ctx = StepContext {
            execution_id: job.execution_id,
            workflow_id: job.workflow_id,
            user_id: job.user_id,
            vars: Context::seeded(&job.input, job.user_id),
        };

        let mut outputs: Vec<Value> = Vec::with_capacity(job.steps.len());
        let mut logs: Vec<StepLog> = Vec::with_capacity(job.steps.len());

        for step in &job.steps {
            let kind = step.action.kind();

            // A registry miss is fatal before the step is ever invoked, so
            // no log entry is appended for it.
            let Some(handler) = self.registry.get(&kind) else {
                let message = EngineError::UnknownStepType(kind).to_string();
                error!(step_id = %step.id, "aborting run: {message}");
                return self.finish_failed(job, logs, message).await;
            };

            let action = match resolve_action(&step.action, &ctx.vars) {
                Ok(action) => action,
                Err(err) => {
                    let message = format!("step configuration failed to resolve: {err}");
                    logs.push(StepLog::failed(&step.id, &message));
                    return self.finish_failed(job, logs, message).await;
                }
            };

            let started = Instant::now();
            match handler.process(&action, &ctx).await {
                Ok(result) => {
                    let time_taken_ms = started.elapsed().as_millis() as u64;
                    info!(step_id = %step.id, time_taken_ms, "step completed");

                    logs.push(StepLog::completed(&step.id, time_taken_ms, result.clone()));
                    ctx.vars.insert(step.id.clone(), result.clone());
                    outputs.push(result);
                }
                Err(err) => {
                    let message = err.to_string();
                    error!(step_id = %step.id, "step failed: {message}");

                    logs.push(StepLog::failed(&step.id, &message));
                    return self.finish_failed(job, logs, message).await;
                }
            }
        }

        let output = serde_json::to_value(&outputs)?;
        self.store
            .update_execution(
                job.execution_id,
                ExecutionPatch {
                    status: Some(ExecutionStatus::Completed),
                    output: Some(output.clone()),
                    logs: Some(serde_json::to_value(&logs)?),
                    completed_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!(steps = job.steps.len(), "execution completed");
        self.notify(job, ExecutionStatus::Completed, Some(output)).await;
        Ok(ExecutionStatus::Completed)
    }

    /// Apply the terminal `FAILED` mutation.  The failure itself is already
    /// captured in `logs`/`message`; a storage error here is logged and
    /// swallowed so the worker can still account the job.
    async fn finish_failed(
        &self,
        job: &Job,
        logs: Vec<StepLog>,
        message: String,
    ) -> Result<ExecutionStatus, EngineError> {
        let patch = ExecutionPatch {
            status: Some(ExecutionStatus::Failed),
            logs: Some(serde_json::to_value(&logs).unwrap_or(Value::Null)),
            error: Some(message),
            completed_at: Some(Utc::now()),
            ..Default::default()
        };

        if let Err(err) = self.store.update_execution(job.execution_id, patch).await {
            error!("could not persist FAILED status: {err}");
        }

        self.notify(job, ExecutionStatus::Failed, None).await;
        Ok(ExecutionStatus::Failed)
    }

    async fn notify(&self, job: &Job, status: ExecutionStatus, payload: Option<Value>) {
        self.notifier
            .publish(ExecutionEvent {
                execution_id: job.execution_id,
                workflow_id: job.workflow_id,
                status,
                payload,
            })
            .await;
    }
}

/// Interpolate every string of a step's configuration against the context.
fn resolve_action(action: &StepAction, vars: &Context) -> Result<StepAction, serde_json::Error> {
    let raw = serde_json::to_value(action)?;
    serde_json::from_value(interpolate_value(&raw, vars))
}
