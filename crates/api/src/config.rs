//! Runtime configuration, read from the environment.
//!
//! There is no config file. Every value has a development default so the
//! service (and the test suite) can start with no environment at all.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::rate_limit::BucketConfig;

pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Quotas for the three rate-limit buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub default: BucketConfig,
    pub public: BucketConfig,
    pub protected: BucketConfig,
    /// Logins weighted 1 on the protected bucket; every other login weighs 2.
    pub light_logins: Vec<String>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let minute = Duration::from_secs(60);
        Self {
            default: BucketConfig::new(5, minute),
            public: BucketConfig::new(10, minute),
            protected: BucketConfig::new(30, minute),
            light_logins: vec!["jetbrains".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub http_port: u16,
    pub https_port: u16,
    /// Directory receiving the generated `cert.pem` / `key.pem`.
    pub keystore_dir: PathBuf,
    pub tls_domains: Vec<String>,

    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub password_salt: String,
    /// Plaintext `(username, password)` pairs shared by basic and digest auth.
    pub users: Vec<(String, String)>,
    /// `(token, principal name)` pairs for bearer auth.
    pub bearer_tokens: Vec<(String, String)>,
    pub digest_nonce_ttl: Duration,

    pub rate_limits: RateLimitSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: 8080,
            https_port: 8443,
            keystore_dir: PathBuf::from("build/keystore"),
            tls_domains: vec![
                "127.0.0.1".to_string(),
                "0.0.0.0".to_string(),
                "localhost".to_string(),
            ],
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl: Duration::from_secs(60),
            password_salt: "turnstile".to_string(),
            users: vec![
                ("jetbrains".to_string(), "foobar".to_string()),
                ("admin".to_string(), "password".to_string()),
            ],
            bearer_tokens: vec![("abc123".to_string(), "jetbrains".to_string())],
            digest_nonce_ttl: Duration::from_secs(300),
            rate_limits: RateLimitSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("TURNSTILE_HOST") {
            config.host = parse("TURNSTILE_HOST", &v)?;
        }
        if let Some(v) = lookup("TURNSTILE_HTTP_PORT") {
            config.http_port = parse("TURNSTILE_HTTP_PORT", &v)?;
        }
        if let Some(v) = lookup("TURNSTILE_HTTPS_PORT") {
            config.https_port = parse("TURNSTILE_HTTPS_PORT", &v)?;
        }
        if let Some(v) = lookup("TURNSTILE_KEYSTORE_DIR") {
            config.keystore_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TURNSTILE_TLS_DOMAINS") {
            config.tls_domains = split_list(&v);
        }

        match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }
        if let Some(v) = lookup("TURNSTILE_JWT_TTL_SECS") {
            let secs: u64 = parse("TURNSTILE_JWT_TTL_SECS", &v)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "TURNSTILE_JWT_TTL_SECS",
                    value: v,
                    reason: "token lifetime must be at least one second".to_string(),
                });
            }
            config.jwt_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("TURNSTILE_PASSWORD_SALT") {
            config.password_salt = v;
        }
        if let Some(v) = lookup("TURNSTILE_USERS") {
            config.users = parse_pairs("TURNSTILE_USERS", &v)?;
        }
        if let Some(v) = lookup("TURNSTILE_BEARER_TOKENS") {
            config.bearer_tokens = parse_pairs("TURNSTILE_BEARER_TOKENS", &v)?;
        }
        if let Some(v) = lookup("TURNSTILE_DIGEST_NONCE_TTL_SECS") {
            config.digest_nonce_ttl =
                Duration::from_secs(parse("TURNSTILE_DIGEST_NONCE_TTL_SECS", &v)?);
        }
        if let Some(v) = lookup("TURNSTILE_LIGHT_LOGINS") {
            config.rate_limits.light_logins = split_list(&v);
        }

        Ok(config)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `a:b,c:d` into pairs. Only the first `:` of each entry splits.
fn parse_pairs(key: &'static str, value: &str) -> Result<Vec<(String, String)>, ConfigError> {
    split_list(value)
        .into_iter()
        .map(|entry| {
            entry
                .split_once(':')
                .filter(|(left, _)| !left.is_empty())
                .map(|(left, right)| (left.to_string(), right.to_string()))
                .ok_or_else(|| ConfigError::InvalidValue {
                    key,
                    value: value.to_string(),
                    reason: format!("entry '{entry}' is not of the form name:value"),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.https_port, 8443);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.bearer_tokens, vec![("abc123".to_string(), "jetbrains".to_string())]);
        assert_eq!(config.rate_limits.default.limit, 5);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TURNSTILE_HTTP_PORT", "9090"),
            ("JWT_SECRET", "s3cret"),
            ("TURNSTILE_USERS", "alice:pa:ss, bob:hunter2"),
            ("TURNSTILE_LIGHT_LOGINS", "alice,bob"),
        ]))
        .unwrap();

        assert_eq!(config.http_port, 9090);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(
            config.users,
            vec![
                ("alice".to_string(), "pa:ss".to_string()),
                ("bob".to_string(), "hunter2".to_string()),
            ]
        );
        assert_eq!(config.rate_limits.light_logins, vec!["alice", "bob"]);
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = AppConfig::from_lookup(lookup(&[("TURNSTILE_HTTP_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "TURNSTILE_HTTP_PORT", .. }));

        let err = AppConfig::from_lookup(lookup(&[("TURNSTILE_BEARER_TOKENS", "nocolon")])).unwrap_err();
        assert!(err.to_string().contains("nocolon"));
    }

    #[test]
    fn zero_jwt_ttl_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("TURNSTILE_JWT_TTL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "TURNSTILE_JWT_TTL_SECS", .. }));

        let config = AppConfig::from_lookup(lookup(&[("TURNSTILE_JWT_TTL_SECS", "1")])).unwrap();
        assert_eq!(config.jwt_ttl, Duration::from_secs(1));
    }
}
