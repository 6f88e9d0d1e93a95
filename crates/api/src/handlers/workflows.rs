use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use engine::{validate_steps, WorkflowDefinition};

use crate::AppState;

#[derive(serde::Deserialize)]
pub struct CreateWorkflowDto {
    pub name: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub is_public: bool,
    pub definition: Value,
}

#[derive(serde::Deserialize)]
pub struct ListQuery {
    pub user_id: Option<Uuid>,
}

pub async fn list(
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<store::WorkflowRow>>, StatusCode> {
    match state.store.list_workflows(query.user_id).await {
        Ok(workflows) => Ok(Json(workflows)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<store::WorkflowRow>, StatusCode> {
    match state.store.get_workflow(id).await {
        Ok(workflow) => Ok(Json(workflow)),
        Err(store::StoreError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkflowDto>,
) -> Result<(StatusCode, Json<store::WorkflowRow>), (StatusCode, String)> {
    // Reject definitions that could never execute: bad shape, bad type
    // tags, duplicate ids, broken or cyclic dependency declarations.
    let definition: WorkflowDefinition = serde_json::from_value(payload.definition.clone())
        .map_err(|err| (StatusCode::BAD_REQUEST, format!("invalid definition: {err}")))?;
    validate_steps(&definition.steps)
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;

    match state
        .store
        .create_workflow(
            &payload.name,
            payload.user_id,
            payload.is_public,
            payload.definition,
        )
        .await
    {
        Ok(workflow) => Ok((StatusCode::CREATED, Json(workflow))),
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

pub async fn delete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    match state.store.delete_workflow(id).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(store::StoreError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
