use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use engine::EngineError;

use crate::AppState;

#[derive(serde::Deserialize)]
pub struct ExecuteWorkflowDto {
    pub user_id: Uuid,
    #[serde(default)]
    pub input: Value,
}

/// Submit a run: creates a PENDING execution, enqueues its job, and
/// returns immediately.  Callers poll `GET /executions/{id}` for progress.
pub async fn execute(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ExecuteWorkflowDto>,
) -> Result<(StatusCode, Json<store::ExecutionRow>), (StatusCode, String)> {
    match state.submitter.submit(id, payload.user_id, payload.input).await {
        Ok(execution) => Ok((StatusCode::ACCEPTED, Json(execution))),
        Err(EngineError::Store(store::StoreError::NotFound)) => {
            Err((StatusCode::NOT_FOUND, "workflow not found".into()))
        }
        Err(err @ (EngineError::DuplicateStepId(_)
        | EngineError::UnknownDependency { .. }
        | EngineError::DependencyCycle
        | EngineError::Definition(_))) => Err((StatusCode::UNPROCESSABLE_ENTITY, err.to_string())),
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<store::ExecutionRow>, StatusCode> {
    match state.store.get_execution(id).await {
        Ok(execution) => Ok(Json(execution)),
        Err(store::StoreError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
