use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::context::RateLimitStatus;
use crate::rate_limit::{rate_limit_middleware, RateLimitName, RateLimitScope, RateLimiter};

pub fn router(limiter: &Arc<RateLimiter>) -> Router {
    let home = Router::new().route("/rate", get(home));

    let public = Router::new()
        .route("/public-api", get(public_api))
        .route("/something-api", get(public_api));

    let protected = Router::new().route("/protected-api", get(protected_api));

    Router::new()
        .merge(limited(home, limiter, RateLimitName::DEFAULT))
        .merge(limited(public, limiter, RateLimitName::PUBLIC))
        .merge(limited(protected, limiter, RateLimitName::PROTECTED))
}

fn limited(router: Router, limiter: &Arc<RateLimiter>, name: RateLimitName) -> Router {
    router.route_layer(from_fn_with_state(
        RateLimitScope::new(limiter.clone(), name),
        rate_limit_middleware,
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub login: String,
}

pub async fn home(Extension(status): Extension<RateLimitStatus>) -> String {
    format!("Welcome to the home page! {} requests left.", status.remaining)
}

pub async fn public_api(Extension(status): Extension<RateLimitStatus>) -> String {
    format!("Welcome to public API! {} requests left.", status.remaining)
}

pub async fn protected_api(
    Extension(status): Extension<RateLimitStatus>,
    Query(query): Query<LoginQuery>,
) -> String {
    format!(
        "Welcome to protected API, {}! {} requests left.",
        query.login, status.remaining
    )
}
