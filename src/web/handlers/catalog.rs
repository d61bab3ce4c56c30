//! Catalog endpoint polled by Teams

use axum::{
    Json,
    extract::State,
    http::{Method, Uri},
    response::IntoResponse,
};

use crate::web::{AppState, extractors::RequestContext, utils::log_request};

/// Serve the background catalog in the shape the configured Teams version expects
pub async fn config_json(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    context: RequestContext,
) -> impl IntoResponse {
    log_request(&method, &uri, &context);
    Json(state.catalog.catalog().await)
}
