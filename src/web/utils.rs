//! Web utility functions

use axum::http::{Method, Uri};
use tracing::debug;

use super::extractors::RequestContext;

/// Log an incoming HTTP request
///
/// Teams polls the catalog every few seconds, so requests are logged at debug.
pub fn log_request(method: &Method, uri: &Uri, context: &RequestContext) {
    debug!(
        method = %method,
        uri = %uri,
        request_id = %context.request_id,
        user_agent = ?context.user_agent,
        "HTTP request"
    );
}
