//! Cookie-backed visit counter.

use axum::{extract::Query, routing::get, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::app::dto::SessionQuery;
use crate::app::errors::ApiError;

pub const COOKIE_NAME: &str = "user_session";
const SESSION_KEY: &str = "user_session";
const DEFAULT_NAME: &str = "guest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub name: String,
    pub count: u32,
}

pub fn router() -> Router {
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_name(COOKIE_NAME)
        .with_path("/")
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(60)));

    Router::new()
        .route("/session/increment", get(increment))
        .route("/session/logout", get(logout))
        .layer(sessions)
}

pub async fn increment(
    session: Session,
    Query(query): Query<SessionQuery>,
) -> Result<String, ApiError> {
    let current = session
        .get::<UserSession>(SESSION_KEY)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let next = match current {
        Some(existing) => UserSession {
            count: existing.count.saturating_add(1),
            ..existing
        },
        None => UserSession {
            name: query.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            count: 1,
        },
    };

    session
        .insert(SESSION_KEY, &next)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(format!("Session for {}: {} visit(s).", next.name, next.count))
}

pub async fn logout(session: Session) -> Result<&'static str, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok("Session cleared.")
}
