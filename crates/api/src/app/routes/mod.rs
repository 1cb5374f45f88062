use axum::Router;

use crate::app::services::AppServices;

pub mod articles;
pub mod auth;
pub mod customers;
pub mod orders;
pub mod rate;
pub mod session;
pub mod system;
pub mod validate;

/// Every feature router. Auth and rate-limit layers are attached per route
/// inside the feature routers, so this tree can be merged flat.
pub fn router(services: &AppServices) -> Router {
    Router::new()
        .merge(auth::router(services.auth.clone()))
        .merge(rate::router(&services.rate_limiter))
        .merge(articles::router())
        .merge(validate::router())
        .merge(session::router())
        .nest("/customer", customers::router())
        .nest("/order", orders::router())
}
