use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::domain::trends::{ParseMetricError, ParseRangeError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The dashboard rejected a gesture, e.g. no chart rendered yet.
    #[error("Dashboard error: {0:#}")]
    Dashboard(anyhow::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Dashboard(e) => {
                tracing::warn!("Dashboard gesture failed: {e:#}");
                (StatusCode::CONFLICT, format!("{e:#}"))
            }
            Self::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ParseRangeError> for ApiError {
    fn from(e: ParseRangeError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<ParseMetricError> for ApiError {
    fn from(e: ParseMetricError) -> Self {
        Self::NotFound(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
