use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use turnstile_core::{Customer, DomainError};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::validation::{JsonBody, Validated};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_customers).post(store_customer))
        .route("/:id", get(get_customer).delete(remove_customer))
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let customers = services.customers.list()?;
    if customers.is_empty() {
        return Ok("No customers found".into_response());
    }
    Ok(Json(customers).into_response())
}

pub async fn store_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Validated(JsonBody(customer)): Validated<JsonBody<Customer>>,
) -> Result<(StatusCode, &'static str), ApiError> {
    services.customers.add(customer)?;
    Ok((StatusCode::CREATED, "Customer stored correctly"))
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> Result<Json<Customer>, ApiError> {
    match services.customers.get(id) {
        Ok(customer) => Ok(Json(customer)),
        Err(DomainError::NotFound) => Err(ApiError::NotFound(format!("No customer with id {id}"))),
        Err(e) => Err(e.into()),
    }
}

pub async fn remove_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, &'static str), ApiError> {
    if services.customers.remove(id)? {
        Ok((StatusCode::ACCEPTED, "Customer removed correctly"))
    } else {
        Err(ApiError::NotFound("Not Found".to_string()))
    }
}
