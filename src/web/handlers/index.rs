//! Index page handler
//!
//! Serves the embedded index page with the address Teams has to be pointed at.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};

use crate::{
    assets::StaticAssets,
    web::{AppState, extractors::RequestContext},
};

/// Serve the index page from embedded static assets
pub async fn index(State(state): State<AppState>, _context: RequestContext) -> impl IntoResponse {
    match StaticAssets::get_asset("static/index.html") {
        Some(file) => {
            let content = String::from_utf8_lossy(&file.data)
                .replace("{{listen_address}}", &state.config.listen_address)
                .replace("{{port}}", &state.config.port.to_string())
                .replace("{{base_url}}", &state.config.service_base_url())
                .replace("{{prefix}}", state.config.teams_version.url_prefix());
            Html(content).into_response()
        }
        None => {
            // Fallback if embedded asset is not found
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h1>500 Internal Server Error</h1><p>Index page not found</p>".to_string()),
            )
                .into_response()
        }
    }
}
