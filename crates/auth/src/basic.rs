//! HTTP Basic authentication.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::AuthError;
use crate::principal::UserIdPrincipal;
use crate::users::HashedUserTable;

/// Decoded `user:password` pair from a Basic header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    /// Parse a full `Authorization` header value (`Basic <base64>`).
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        let (scheme, encoded) = header
            .trim()
            .split_once(' ')
            .ok_or_else(|| AuthError::malformed("missing basic payload"))?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(AuthError::MissingCredentials);
        }

        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AuthError::malformed(format!("base64: {e}")))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| AuthError::malformed("credentials are not utf-8"))?;

        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| AuthError::malformed("missing ':' separator"))?;

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn encode(&self) -> String {
        format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", self.username, self.password))
        )
    }
}

#[derive(Debug, Clone)]
pub struct BasicAuthenticator {
    realm: String,
    users: HashedUserTable,
}

impl BasicAuthenticator {
    pub fn new(realm: impl Into<String>, users: HashedUserTable) -> Self {
        Self {
            realm: realm.into(),
            users,
        }
    }

    pub fn authenticate(&self, header: Option<&str>) -> Result<UserIdPrincipal, AuthError> {
        let header = header.ok_or(AuthError::MissingCredentials)?;
        let credentials = BasicCredentials::parse(header)?;
        self.users
            .authenticate(&credentials.username, &credentials.password)
            .ok_or(AuthError::InvalidCredentials)
    }

    /// `WWW-Authenticate` value sent with a 401.
    pub fn challenge(&self) -> String {
        format!("Basic realm=\"{}\", charset=\"UTF-8\"", self.realm)
    }
}
