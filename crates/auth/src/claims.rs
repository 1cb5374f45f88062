use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT claims model.
///
/// Timestamps are seconds since the Unix epoch, as required by the JWT
/// registered claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issuer.
    pub iss: String,

    /// Audience.
    pub aud: String,

    /// Name submitted at login.
    pub username: String,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,

    /// Unique token identifier.
    pub jti: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("username claim is empty")]
    MissingUsername,
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature, issuer and audience are
/// checked by [`crate::JwtManager`] before this runs.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.username.trim().is_empty() {
        return Err(TokenValidationError::MissingUsername);
    }
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat: i64, exp: i64, username: &str) -> JwtClaims {
        JwtClaims {
            iss: "iss".to_string(),
            aud: "aud".to_string(),
            username: username.to_string(),
            iat,
            exp,
            jti: "id".to_string(),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn accepts_claims_inside_window() {
        assert_eq!(validate_claims(&claims(100, 160, "jetbrains"), at(130)), Ok(()));
    }

    #[test]
    fn rejects_expired_and_future_claims() {
        let c = claims(100, 160, "jetbrains");
        assert_eq!(validate_claims(&c, at(160)), Err(TokenValidationError::Expired));
        assert_eq!(validate_claims(&c, at(99)), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn rejects_empty_username_and_inverted_window() {
        assert_eq!(
            validate_claims(&claims(100, 160, " "), at(130)),
            Err(TokenValidationError::MissingUsername)
        );
        assert_eq!(
            validate_claims(&claims(160, 100, "a"), at(130)),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
