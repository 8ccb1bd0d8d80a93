//! # tessera-api
//!
//! HTTP API server for tessera: the dashboard group listing and the notes
//! endpoints used by the notes panel.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod query_types;
pub mod services;
pub mod state;
pub mod views;

#[cfg(test)]
mod fake_store;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub use config::AppConfig;
pub use error::ApiError;
pub use state::AppState;

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Application routes with the rate limiter applied. Transport layers
/// (tracing, request ids, CORS, body limit) are added by the binary.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/dashboard/groups", get(handlers::groups::list_groups))
        .route(
            "/dashboard/groups.json",
            get(handlers::groups::list_groups_json),
        )
        .route(
            "/noteables/:noteable_type/:noteable_id/discussions",
            get(handlers::notes::list_discussions),
        )
        .route(
            "/noteables/:noteable_type/:noteable_id/notes",
            get(handlers::notes::poll_notes).post(handlers::notes::create_note),
        )
        .route("/notes/:id", put(handlers::notes::update_note))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            tracing::warn!(subsystem = "api", component = "rate_limit", "Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}
