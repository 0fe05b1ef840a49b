use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{Method, Uri};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::details;
use crate::error::{ApiError, ApiErrorKind};
use crate::github::{PullRequestDetail, PullRequestSource};

/// State shared by every inbound request: one source, hence one ETag cache.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn PullRequestSource>,
    max_concurrency: usize,
}

impl AppState {
    pub fn new(source: Arc<dyn PullRequestSource>, max_concurrency: usize) -> Self {
        Self {
            source,
            max_concurrency,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check).fallback(method_not_allowed))
        .route(
            "/api/v1/repos/:owner/:repo/pulls",
            get(open_pull_requests).fallback(method_not_allowed),
        )
        .fallback(unknown_route)
        .with_state(state)
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state)).await
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn open_pull_requests(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Vec<PullRequestDetail>>, ApiError> {
    let Path((owner, repo)) = path.map_err(|rejection| {
        ApiError::new(
            ApiErrorKind::BadRequest,
            format!("Invalid repository path: {}", rejection.body_text()),
        )
    })?;

    match details::open_pull_request_details(
        state.source.as_ref(),
        &owner,
        &repo,
        state.max_concurrency,
    )
    .await
    {
        Ok(details) => {
            info!(count = details.len(), "returning pull request details");
            Ok(Json(details))
        }
        Err(err) => {
            warn!(http_code = err.http_code(), error = %err.message, "request failed");
            Err(err)
        }
    }
}

async fn unknown_route(uri: Uri) -> ApiError {
    ApiError::new(ApiErrorKind::NotFound, format!("No route for {uri}."))
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::new(
        ApiErrorKind::MethodNotAllowed,
        format!("{method} is not supported on {uri}."),
    )
}
