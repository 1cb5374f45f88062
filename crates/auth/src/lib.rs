//! `turnstile-auth`: credential verification for the four supported schemes.
//!
//! This crate is intentionally decoupled from HTTP frameworks: callers hand in
//! raw `Authorization` header values and get back a principal or an
//! [`AuthError`]. Challenges are returned as plain header strings.

pub mod basic;
pub mod bearer;
pub mod claims;
pub mod digest;
pub mod error;
pub mod jwt;
pub mod principal;
pub mod users;

pub use basic::{BasicAuthenticator, BasicCredentials};
pub use bearer::BearerAuthenticator;
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use digest::{DigestAlgorithm, DigestAuthenticator, DigestCredentials};
pub use error::AuthError;
pub use jwt::{JwtConfig, JwtManager};
pub use principal::{DigestPrincipal, JwtPrincipal, UserIdPrincipal};
pub use users::HashedUserTable;
