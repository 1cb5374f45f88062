//! Values the middleware chain attaches to a request for handlers to read.

use std::time::Duration;

use turnstile_auth::{DigestPrincipal, JwtPrincipal, UserIdPrincipal};

use crate::rate_limit::RateLimitName;

/// Identity established by whichever auth layer guarded the route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalContext {
    Basic(UserIdPrincipal),
    Bearer(UserIdPrincipal),
    Digest(DigestPrincipal),
    Jwt(JwtPrincipal),
}

impl PrincipalContext {
    pub fn name(&self) -> &str {
        match self {
            Self::Basic(p) | Self::Bearer(p) => &p.name,
            Self::Digest(p) => &p.user_name,
            Self::Jwt(p) => p.username(),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Bearer(_) => "bearer",
            Self::Digest(_) => "digest",
            Self::Jwt(_) => "jwt",
        }
    }
}

/// Quota left in the bucket that admitted this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub bucket: RateLimitName,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}
