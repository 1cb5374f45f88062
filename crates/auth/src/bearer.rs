//! Opaque bearer tokens looked up in a fixed table.

use std::collections::HashMap;

use crate::error::AuthError;
use crate::principal::UserIdPrincipal;

#[derive(Debug, Clone)]
pub struct BearerAuthenticator {
    realm: String,
    tokens: HashMap<String, String>,
}

impl BearerAuthenticator {
    /// `tokens` maps a token to the principal name it authenticates.
    pub fn new<I, T, N>(realm: impl Into<String>, tokens: I) -> Self
    where
        I: IntoIterator<Item = (T, N)>,
        T: Into<String>,
        N: Into<String>,
    {
        Self {
            realm: realm.into(),
            tokens: tokens
                .into_iter()
                .map(|(t, n)| (t.into(), n.into()))
                .collect(),
        }
    }

    pub fn authenticate(&self, header: Option<&str>) -> Result<UserIdPrincipal, AuthError> {
        let token = extract_bearer(header.ok_or(AuthError::MissingCredentials)?)?;
        self.tokens
            .get(token)
            .map(UserIdPrincipal::new)
            .ok_or(AuthError::InvalidCredentials)
    }

    pub fn challenge(&self) -> String {
        format!("Bearer realm=\"{}\"", self.realm)
    }
}

/// Strip the `Bearer ` scheme from an `Authorization` header value.
pub fn extract_bearer(header: &str) -> Result<&str, AuthError> {
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingCredentials)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::malformed("empty bearer token"));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> BearerAuthenticator {
        BearerAuthenticator::new("realm", [("abc123", "jetbrains")])
    }

    #[test]
    fn known_token_is_accepted() {
        let principal = authenticator().authenticate(Some("Bearer abc123")).unwrap();
        assert_eq!(principal.name, "jetbrains");
    }

    #[test]
    fn other_tokens_are_rejected() {
        let auth = authenticator();
        assert_eq!(
            auth.authenticate(Some("Bearer abc124")),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.authenticate(Some("Basic abc123")),
            Err(AuthError::MissingCredentials)
        );
        assert!(auth.authenticate(Some("Bearer   ")).is_err());
    }
}
