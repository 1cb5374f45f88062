use axum::{body::Bytes, routing::post, Router};

use turnstile_core::Customer;

use crate::validation::{JsonBody, Validated};

pub fn router() -> Router {
    Router::new()
        .route("/text", post(echo_text))
        .route("/json", post(customer_id))
        .route("/array", post(echo_bytes))
}

pub async fn echo_text(Validated(body): Validated<String>) -> String {
    body
}

pub async fn customer_id(Validated(JsonBody(customer)): Validated<JsonBody<Customer>>) -> String {
    format!("Customer id is {}", customer.id)
}

pub async fn echo_bytes(Validated(body): Validated<Bytes>) -> String {
    String::from_utf8_lossy(&body).into_owned()
}
