//! Request body validation.
//!
//! A body type opts in by implementing [`Validate`]; handlers then extract
//! [`Validated<T>`] instead of `T`. Failing rules short-circuit the request
//! with a 400 listing every reason.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use turnstile_core::Customer;

use crate::app::errors::{ApiError, json_error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(vec![reason.into()])
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

impl Validate for String {
    fn validate(&self) -> ValidationResult {
        if self.starts_with("Hello") {
            ValidationResult::Valid
        } else {
            ValidationResult::invalid("Body text should start with 'Hello'")
        }
    }
}

impl Validate for Customer {
    fn validate(&self) -> ValidationResult {
        if self.id > 0 {
            ValidationResult::Valid
        } else {
            ValidationResult::invalid("A customer ID should be greater than 0")
        }
    }
}

/// Raw bodies must carry a positive integer.
impl Validate for Bytes {
    fn validate(&self) -> ValidationResult {
        let parsed = std::str::from_utf8(self)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok());

        match parsed {
            Some(n) if n > 0 => ValidationResult::Valid,
            Some(_) => ValidationResult::invalid("A value should be greater than 0"),
            None => ValidationResult::invalid("A value should be an integer"),
        }
    }
}

/// JSON body whose parse failures are reported as a JSON error document.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

impl<T: Validate> Validate for JsonBody<T> {
    fn validate(&self) -> ValidationResult {
        self.0.validate()
    }
}

fn json_rejection(rejection: JsonRejection) -> Response {
    tracing::debug!(error = %rejection.body_text(), "rejected json body");
    json_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
}

/// Extractor that runs [`Validate`] on the inner body.
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: FromRequest<S> + Validate,
    T::Rejection: IntoResponse,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let value = T::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match value.validate() {
            ValidationResult::Valid => Ok(Self(value)),
            ValidationResult::Invalid(reasons) => {
                tracing::debug!(?reasons, "request body failed validation");
                Err(ApiError::Validation(reasons).into_response())
            }
        }
    }
}
