use serde::{Deserialize, Serialize};

// -------------------------
// Request DTOs
// -------------------------

/// Credentials posted to `/auth/jwt/login`. They are not checked.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub name: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
