//! Shared API key check for protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::{I18nError, ServiceError};

use super::AppState;

/// Header names accepted for the key
const API_KEY_HEADERS: [&str; 2] = ["api-key", "api_key"];

/// Reject requests whose API key header is missing or wrong with 403
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, I18nError> {
    let provided = API_KEY_HEADERS
        .iter()
        .find_map(|name| req.headers().get(*name))
        .and_then(|value| value.to_str().ok());

    if provided != Some(state.api_key.as_str()) {
        warn!(path = %req.uri().path(), "Rejected request with invalid API key");
        return Err(state.i18n_error(ServiceError::Forbidden));
    }

    Ok(next.run(req).await)
}
