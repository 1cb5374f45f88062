use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use turnstile_auth::{
    AuthError, BasicAuthenticator, BearerAuthenticator, DigestAuthenticator, JwtManager,
};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

pub const JWT_FAILURE_MESSAGE: &str = "Token is not valid or has expired";

/// Authenticators for every scheme, shared by the auth layers.
#[derive(Clone)]
pub struct AuthState {
    pub basic: Arc<BasicAuthenticator>,
    pub digest: Arc<DigestAuthenticator>,
    pub bearer: Arc<BearerAuthenticator>,
    pub jwt: JwtManager,
}

pub async fn basic_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    match state.basic.authenticate(authorization(req.headers())) {
        Ok(principal) => {
            req.extensions_mut().insert(PrincipalContext::Basic(principal));
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(scheme = "basic", error = %err, "authentication failed");
            challenge([state.basic.challenge()])
        }
    }
}

pub async fn bearer_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    match state.bearer.authenticate(authorization(req.headers())) {
        Ok(principal) => {
            req.extensions_mut().insert(PrincipalContext::Bearer(principal));
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(scheme = "bearer", error = %err, "authentication failed");
            challenge([state.bearer.challenge()])
        }
    }
}

pub async fn digest_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    // Clients sign the URI they sent, which differs from `req.uri()` under nesting.
    let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.clone())
        .unwrap_or_else(|| req.uri().clone());
    let request_uri = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| uri.path().to_owned());

    let result = state.digest.authenticate(
        req.method().as_str(),
        &request_uri,
        authorization(req.headers()),
    );

    match result {
        Ok(principal) => {
            req.extensions_mut().insert(PrincipalContext::Digest(principal));
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(scheme = "digest", error = %err, "authentication failed");
            challenge(state.digest.challenges(err == AuthError::StaleNonce))
        }
    }
}

pub async fn jwt_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let verified = authorization(req.headers())
        .ok_or(AuthError::MissingCredentials)
        .and_then(turnstile_auth::bearer::extract_bearer)
        .and_then(|token| state.jwt.verify(token));

    match verified {
        Ok(principal) => {
            req.extensions_mut().insert(PrincipalContext::Jwt(principal));
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(scheme = "jwt", error = %err, "authentication failed");
            let challenge = format!("Bearer realm=\"{}\"", state.jwt.config().realm);
            let mut response = ApiError::Unauthorized(JWT_FAILURE_MESSAGE.to_string()).into_response();
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
            response
        }
    }
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Bare 401 carrying one `WWW-Authenticate` header per challenge.
fn challenge(values: impl IntoIterator<Item = String>) -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    for value in values {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().append(header::WWW_AUTHENTICATE, value);
        }
    }
    response
}
