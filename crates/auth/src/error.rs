use thiserror::Error;

use crate::claims::TokenValidationError;

/// Failure of a credential check.
///
/// Every variant maps to a 401 at the HTTP boundary; the distinction only
/// matters for logging and for the digest `stale` flag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no credentials supplied")]
    MissingCredentials,

    #[error("malformed credentials: {0}")]
    MalformedCredentials(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("nonce is unknown or expired")]
    StaleNonce,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl AuthError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedCredentials(msg.into())
    }
}

impl From<TokenValidationError> for AuthError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => Self::TokenExpired,
            other => Self::InvalidToken(other.to_string()),
        }
    }
}
