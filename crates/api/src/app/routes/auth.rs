use std::sync::Arc;

use axum::{
    extract::Extension,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use crate::app::dto::{LoginRequest, TokenResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;
use crate::middleware::{self, AuthState};
use crate::validation::JsonBody;

pub fn router(auth: AuthState) -> Router {
    let basic = Router::new()
        .route("/auth/login", get(hello))
        .route_layer(from_fn_with_state(auth.clone(), middleware::basic_auth));

    let digest = Router::new()
        .route("/auth/digest-login", get(hello))
        .route_layer(from_fn_with_state(auth.clone(), middleware::digest_auth));

    let bearer = Router::new()
        .route("/auth/user", get(hello))
        .route_layer(from_fn_with_state(auth.clone(), middleware::bearer_auth));

    let jwt = Router::new()
        .route("/auth/jwt/hello", get(jwt_hello))
        .route_layer(from_fn_with_state(auth, middleware::jwt_auth));

    Router::new()
        .route("/auth/jwt/login", post(jwt_login))
        .merge(basic)
        .merge(digest)
        .merge(bearer)
        .merge(jwt)
}

pub async fn hello(Extension(principal): Extension<PrincipalContext>) -> String {
    format!("Hello, {}!", principal.name())
}

/// Issue a token for whatever username is posted.
pub async fn jwt_login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = services
        .auth
        .jwt
        .issue(&body.username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(username = %body.username, "issued jwt");
    Ok(Json(TokenResponse { token }))
}

pub async fn jwt_hello(
    Extension(principal): Extension<PrincipalContext>,
) -> Result<String, ApiError> {
    let PrincipalContext::Jwt(jwt) = &principal else {
        return Err(ApiError::Internal(format!(
            "jwt route reached with {} principal",
            principal.scheme()
        )));
    };

    let left_ms = jwt.expires_in_ms(Utc::now()).unwrap_or_default();
    Ok(format!(
        "Hello, {}! Token is expired at {} ms.",
        jwt.username(),
        left_ms
    ))
}
