use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::{AppState, service::ServiceError, storage::StoragesStatus};

pub mod corpuses;
pub mod documents;
pub mod extracts;
pub mod sessions;

pub mod types;

pub use corpuses::corpus_routes;
pub use documents::document_routes;
pub use extracts::extract_routes;
pub use sessions::session_routes;

pub(crate) type ApiError = (StatusCode, String);

/// Maps a service error onto a status code, prefixing the message with `action`.
pub(crate) fn api_error(action: &'static str) -> impl Fn(anyhow::Error) -> ApiError {
    move |err| {
        let status = match err.downcast_ref::<ServiceError>() {
            Some(ServiceError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Some(ServiceError::Invalid(_)) => StatusCode::BAD_REQUEST,
            None => {
                error!(error = %err, action, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, format!("failed to {action}: {err}"))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(corpus_routes())
        .merge(document_routes())
        .merge(extract_routes())
        .merge(session_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.storages_status {
        StoragesStatus::Initialized => (StatusCode::OK, "ok"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "storages not ready"),
    }
}
