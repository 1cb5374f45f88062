use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use turnstile_core::DomainError;

/// Failures a handler or middleware can surface to the client.
///
/// Everything except malformed JSON is rendered as plain text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("429: Too many requests. Wait for {retry_after} seconds.")]
    RateLimited { retry_after: u64 },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Self::Internal(msg) = &self {
            tracing::error!(error = %msg, "request failed");
            return (status, "Internal Server Error").into_response();
        }

        let mut response = (status, self.to_string()).into_response();
        if let Self::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(vec![msg]),
            DomainError::NotFound => Self::NotFound("Not Found".to_string()),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Unavailable => Self::Internal("storage unavailable".to_string()),
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_reasons_are_joined() {
        let err = ApiError::Validation(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(err.to_string(), "first, second");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited { retry_after: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        assert_eq!(ApiError::from(DomainError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(DomainError::Conflict("dup".to_string())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DomainError::Unavailable).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
