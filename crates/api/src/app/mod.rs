//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: shared handles (stores, authenticators, limiter, metrics)
//! - `routes/`: HTTP routes + handlers (one file per feature area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: error-to-response mapping

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::{metrics, rate_limit};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Must be called inside a Tokio runtime: it spawns the idle-bucket sweeper.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config)?);

    rate_limit::spawn_purge_task(&services.rate_limiter, Duration::from_secs(60));

    let app = Router::new()
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics))
        .merge(routes::router(&services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(services.clone()))
                .layer(axum::middleware::from_fn_with_state(
                    services.metrics.clone(),
                    metrics::track_metrics,
                )),
        );

    Ok(app)
}
