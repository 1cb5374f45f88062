use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::get,
    Json, Router,
};

use turnstile_core::{format_cents, Order};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/total", get(order_total))
}

pub async fn list_orders(Extension(services): Extension<Arc<AppServices>>) -> Json<Vec<Order>> {
    Json(services.orders.list().to_vec())
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    find(&services, &id).map(|order| Json(order.clone()))
}

pub async fn order_total(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    find(&services, &id).map(|order| format_cents(order.total()))
}

fn find<'a>(services: &'a AppServices, id: &str) -> Result<&'a Order, ApiError> {
    services
        .orders
        .get(id)
        .ok_or_else(|| ApiError::NotFound("Not Found".to_string()))
}
