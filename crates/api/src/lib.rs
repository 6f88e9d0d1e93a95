//! `api` crate — HTTP REST surface.
//!
//! The minimal contract external callers need to enqueue and inspect
//! executions:
//!   POST   /api/v1/workflows
//!   GET    /api/v1/workflows
//!   GET    /api/v1/workflows/{id}
//!   DELETE /api/v1/workflows/{id}
//!   POST   /api/v1/workflows/{id}/execute
//!   GET    /api/v1/executions/{id}
//!
//! Authentication, rate limiting, and billing enforcement sit in front of
//! this service and are out of scope here.

pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use engine::Submitter;
use store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub submitter: Arc<Submitter>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/workflows",
            get(handlers::workflows::list).post(handlers::workflows::create),
        )
        .route(
            "/api/v1/workflows/:id",
            get(handlers::workflows::get).delete(handlers::workflows::delete),
        )
        .route(
            "/api/v1/workflows/:id/execute",
            post(handlers::executions::execute),
        )
        .route("/api/v1/executions/:id", get(handlers::executions::get))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, state: AppState) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("API listening on {bind}");
    axum::serve(listener, router(state)).await
}
