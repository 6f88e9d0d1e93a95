//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like in
//! memory.  [`WorkflowDefinition`] serialises to/from the JSON `definition`
//! column of the workflows table; [`Job`] serialises into the job journal's
//! `payload` column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use steps::StepAction;
use store::WorkflowRow;

use crate::EngineError;

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// How a workflow run is started.  Triggers are carried for external
/// schedulers and event routers; the engine itself never evaluates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Started explicitly through the submission API.
    Manual,
    /// Started by an external event source (repository webhook, queue, …).
    ExternalEvent {
        #[serde(default)]
        config: Value,
    },
    /// Started on a schedule.
    Schedule {
        #[serde(default)]
        config: Value,
    },
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A single unit of work within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier within this workflow; later steps reference this
    /// step's result under the same key.
    pub id: String,
    /// Type tag plus typed configuration.
    #[serde(flatten)]
    pub action: StepAction,
    /// Declared upstream steps.  Validated for referential integrity and
    /// acyclicity, but execution is strictly in list order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// The step/trigger payload persisted in the `definition` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub steps: Vec<Step>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

/// A complete workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub is_public: bool,
    pub definition: WorkflowDefinition,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    /// Rehydrate a workflow from its persisted row.
    pub fn from_row(row: &WorkflowRow) -> Result<Self, EngineError> {
        let definition: WorkflowDefinition = serde_json::from_value(row.definition.clone())?;
        Ok(Self {
            id: row.id,
            name: row.name.clone(),
            user_id: row.user_id,
            is_public: row.is_public,
            definition,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// The queue message: an immutable snapshot of one execution request.
///
/// Carries its own copy of the step list, so edits to the workflow after
/// submission never affect an in-flight run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub workflow_id: Uuid,
    pub user_id: Uuid,
    pub steps: Vec<Step>,
    pub input: Value,
}

// ---------------------------------------------------------------------------
// StepLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepLogStatus {
    Completed,
    Failed,
}

/// One entry of an execution's `logs` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLog {
    pub step_id: String,
    pub status: StepLogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepLog {
    pub fn completed(step_id: impl Into<String>, time_taken_ms: u64, result: Value) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepLogStatus::Completed,
            time_taken_ms: Some(time_taken_ms),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(step_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepLogStatus::Failed,
            time_taken_ms: None,
            result: None,
            error: Some(error.into()),
        }
    }
}
