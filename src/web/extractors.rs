//! Request extractors

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

/// Request context information
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub request_id: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            user_agent: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        Ok(Self {
            user_agent,
            ..Self::default()
        })
    }
}
