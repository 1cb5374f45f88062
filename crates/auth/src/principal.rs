use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::JwtClaims;

/// Principal produced by the basic and bearer schemes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdPrincipal {
    pub name: String,
}

impl UserIdPrincipal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Principal produced by the digest scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestPrincipal {
    pub user_name: String,
    pub realm: String,
}

/// Principal produced by a verified JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtPrincipal {
    pub claims: JwtClaims,
}

impl JwtPrincipal {
    pub fn username(&self) -> &str {
        &self.claims.username
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.claims.exp, 0).single()
    }

    /// Milliseconds left until expiry, relative to `now`. Negative once expired.
    pub fn expires_in_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at()
            .map(|exp| (exp - now).num_milliseconds())
    }
}
