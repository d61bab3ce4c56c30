//! Health check HTTP handler

use axum::{
    Json,
    extract::State,
    http::{Method, Uri},
    response::IntoResponse,
};

use crate::web::{AppState, extractors::RequestContext, utils::log_request};

/// Health check endpoint
///
/// Always answers 200; a degraded or stale image directory is reported in the
/// body because the service keeps serving the last good catalog.
pub async fn health_check(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    context: RequestContext,
) -> impl IntoResponse {
    log_request(&method, &uri, &context);
    Json(state.catalog.health().await)
}
