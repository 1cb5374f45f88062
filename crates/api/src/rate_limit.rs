//! Named rate-limit buckets.
//!
//! Each registered policy owns a quota (`limit` weight units per
//! `refill_period`), a key function splitting callers into independent
//! buckets, and a weight function deciding what a request costs. A bucket is
//! refilled to its full quota once `refill_period` has elapsed since its last
//! refill.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::app::errors::ApiError;
use crate::context::RateLimitStatus;

pub const X_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Bucket family identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitName(Cow<'static, str>);

impl RateLimitName {
    /// The unnamed bucket.
    pub const DEFAULT: Self = Self(Cow::Borrowed(""));
    pub const PUBLIC: Self = Self(Cow::Borrowed("public"));
    pub const PROTECTED: Self = Self(Cow::Borrowed("protected"));
}

impl core::fmt::Display for RateLimitName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0.is_empty() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Quota for one bucket family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    pub limit: u32,
    pub refill_period: Duration,
}

impl BucketConfig {
    pub fn new(limit: u32, refill_period: Duration) -> Self {
        Self {
            limit,
            refill_period,
        }
    }
}

/// Derives the bucket key for a request.
pub type KeyFn = Arc<dyn Fn(&Request) -> Result<String, ApiError> + Send + Sync>;

/// Cost of a request, given its key.
pub type WeightFn = Arc<dyn Fn(&Request, &str) -> u32 + Send + Sync>;

#[derive(Clone)]
pub struct RateLimitPolicy {
    pub config: BucketConfig,
    pub key: KeyFn,
    pub weight: WeightFn,
}

impl RateLimitPolicy {
    /// One global bucket, every request weighs 1.
    pub fn global(config: BucketConfig) -> Self {
        Self {
            config,
            key: Arc::new(|_: &Request| Ok::<_, ApiError>(String::new())),
            weight: Arc::new(|_: &Request, _: &str| -> u32 { 1 }),
        }
    }

    pub fn with_key(mut self, key: impl Fn(&Request) -> Result<String, ApiError> + Send + Sync + 'static) -> Self {
        self.key = Arc::new(key);
        self
    }

    pub fn with_weight(mut self, weight: impl Fn(&Request, &str) -> u32 + Send + Sync + 'static) -> Self {
        self.weight = Arc::new(weight);
        self
    }
}

/// Outcome of charging a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_after: Duration,
    },
    Exhausted {
        limit: u32,
        retry_after: Duration,
    },
}

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    config: BucketConfig,
    last_refill: Instant,
}

impl Bucket {
    fn new(config: BucketConfig, now: Instant) -> Self {
        Self {
            tokens: config.limit,
            config,
            last_refill: now,
        }
    }

    fn try_consume(&mut self, weight: u32, now: Instant) -> RateLimitDecision {
        if now.saturating_duration_since(self.last_refill) >= self.config.refill_period {
            self.tokens = self.config.limit;
            self.last_refill = now;
        }

        let reset_after = self
            .config
            .refill_period
            .saturating_sub(now.saturating_duration_since(self.last_refill));

        if self.tokens >= weight {
            self.tokens -= weight;
            RateLimitDecision::Allowed {
                limit: self.config.limit,
                remaining: self.tokens,
                reset_after,
            }
        } else {
            RateLimitDecision::Exhausted {
                limit: self.config.limit,
                retry_after: reset_after,
            }
        }
    }

    fn is_idle(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_refill) >= self.config.refill_period
    }
}

/// Registry of policies plus their live buckets.
#[derive(Default)]
pub struct RateLimiter {
    policies: HashMap<RateLimitName, RateLimitPolicy>,
    buckets: DashMap<(RateLimitName, String), Bucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: RateLimitName, policy: RateLimitPolicy) -> Self {
        self.policies.insert(name, policy);
        self
    }

    pub fn policy(&self, name: &RateLimitName) -> Option<&RateLimitPolicy> {
        self.policies.get(name)
    }

    /// Charge `weight` units against bucket `(name, key)`.
    pub fn check(
        &self,
        name: &RateLimitName,
        key: &str,
        weight: u32,
        now: Instant,
    ) -> Result<RateLimitDecision, ApiError> {
        let policy = self
            .policies
            .get(name)
            .ok_or_else(|| ApiError::Internal(format!("rate limit '{name}' is not registered")))?;

        let mut bucket = self
            .buckets
            .entry((name.clone(), key.to_string()))
            .or_insert_with(|| Bucket::new(policy.config, now));

        Ok(bucket.try_consume(weight, now))
    }

    /// Drop buckets whose window has fully elapsed; they would be refilled anyway.
    pub fn purge_idle(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_idle(now));
        before - self.buckets.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Periodically purge idle buckets until the limiter is dropped.
pub fn spawn_purge_task(limiter: &Arc<RateLimiter>, every: Duration) {
    let limiter: Weak<RateLimiter> = Arc::downgrade(limiter);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            let purged = limiter.purge_idle(Instant::now());
            if purged > 0 {
                tracing::debug!(purged, "purged idle rate-limit buckets");
            }
        }
    });
}

/// Build the limiter with the default, `public` and `protected` families.
pub fn build_limiter(settings: &crate::config::RateLimitSettings) -> RateLimiter {
    let light_logins = settings.light_logins.clone();

    RateLimiter::new()
        .register(RateLimitName::DEFAULT, RateLimitPolicy::global(settings.default))
        .register(RateLimitName::PUBLIC, RateLimitPolicy::global(settings.public))
        .register(
            RateLimitName::PROTECTED,
            RateLimitPolicy::global(settings.protected)
                .with_key(login_key)
                .with_weight(move |_, login| {
                    if light_logins.iter().any(|l| l == login) { 1 } else { 2 }
                }),
        )
}

/// Key function for the protected family: the `login` query parameter.
pub fn login_key(req: &Request) -> Result<String, ApiError> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .map_err(|_| ApiError::BadRequest("Malformed query string".to_string()))?;

    params
        .get("login")
        .filter(|l| !l.is_empty())
        .cloned()
        .ok_or_else(|| ApiError::BadRequest("Missing 'login' query parameter".to_string()))
}

/// Middleware state: which family a route is charged against.
#[derive(Clone)]
pub struct RateLimitScope {
    limiter: Arc<RateLimiter>,
    name: RateLimitName,
}

impl RateLimitScope {
    pub fn new(limiter: Arc<RateLimiter>, name: RateLimitName) -> Self {
        Self { limiter, name }
    }
}

pub async fn rate_limit_middleware(
    State(scope): State<RateLimitScope>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let policy = scope
        .limiter
        .policy(&scope.name)
        .ok_or_else(|| ApiError::Internal(format!("rate limit '{}' is not registered", scope.name)))?;

    let key = (policy.key)(&req)?;
    let weight = (policy.weight)(&req, &key);

    match scope.limiter.check(&scope.name, &key, weight, Instant::now())? {
        RateLimitDecision::Allowed {
            limit,
            remaining,
            reset_after,
        } => {
            req.extensions_mut().insert(RateLimitStatus {
                bucket: scope.name.clone(),
                limit,
                remaining,
                reset_after,
            });

            let mut response = next.run(req).await;
            set_headers(&mut response, limit, remaining, reset_after);
            Ok(response)
        }
        RateLimitDecision::Exhausted { limit, retry_after } => {
            tracing::debug!(
                bucket = %scope.name,
                key = %key,
                weight,
                retry_after_secs = retry_after.as_secs_f64(),
                "rate limit exceeded"
            );
            let mut response = ApiError::RateLimited {
                retry_after: ceil_secs(retry_after),
            }
            .into_response();
            set_headers(&mut response, limit, 0, retry_after);
            Ok(response)
        }
    }
}

fn set_headers(response: &mut Response, limit: u32, remaining: u32, reset_after: Duration) {
    let headers = response.headers_mut();
    headers.insert(X_RATE_LIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(X_RATE_LIMIT_RESET, HeaderValue::from(ceil_secs(reset_after)));
}

/// Whole seconds, rounded up, never below 1.
pub fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn minute(limit: u32) -> BucketConfig {
        BucketConfig::new(limit, Duration::from_secs(60))
    }

    fn request(uri: &str) -> Request {
        Request::builder().uri(uri).body(axum::body::Body::empty()).unwrap()
    }

    #[test]
    fn sixth_request_in_window_is_exhausted() {
        let limiter = RateLimiter::new().register(RateLimitName::DEFAULT, RateLimitPolicy::global(minute(5)));
        let now = Instant::now();

        for expected_remaining in (0..5).rev() {
            let decision = limiter.check(&RateLimitName::DEFAULT, "", 1, now).unwrap();
            assert!(matches!(decision, RateLimitDecision::Allowed { remaining, .. } if remaining == expected_remaining));
        }

        let decision = limiter.check(&RateLimitName::DEFAULT, "", 1, now).unwrap();
        assert!(matches!(decision, RateLimitDecision::Exhausted { limit: 5, .. }));
    }

    #[test]
    fn bucket_refills_after_period() {
        let limiter = RateLimiter::new().register(RateLimitName::DEFAULT, RateLimitPolicy::global(minute(1)));
        let start = Instant::now();

        limiter.check(&RateLimitName::DEFAULT, "", 1, start).unwrap();
        assert!(matches!(
            limiter.check(&RateLimitName::DEFAULT, "", 1, start + Duration::from_secs(59)).unwrap(),
            RateLimitDecision::Exhausted { .. }
        ));
        assert!(matches!(
            limiter.check(&RateLimitName::DEFAULT, "", 1, start + Duration::from_secs(60)).unwrap(),
            RateLimitDecision::Allowed { remaining: 0, .. }
        ));
    }

    #[test]
    fn keys_have_independent_buckets() {
        let limiter = RateLimiter::new().register(RateLimitName::PROTECTED, RateLimitPolicy::global(minute(2)));
        let now = Instant::now();

        limiter.check(&RateLimitName::PROTECTED, "a", 2, now).unwrap();
        assert!(matches!(
            limiter.check(&RateLimitName::PROTECTED, "a", 1, now).unwrap(),
            RateLimitDecision::Exhausted { .. }
        ));
        assert!(matches!(
            limiter.check(&RateLimitName::PROTECTED, "b", 1, now).unwrap(),
            RateLimitDecision::Allowed { remaining: 1, .. }
        ));
    }

    #[test]
    fn unregistered_family_is_an_error() {
        let limiter = RateLimiter::new();
        assert!(limiter.check(&RateLimitName::PUBLIC, "", 1, Instant::now()).is_err());
    }

    #[test]
    fn login_key_reads_query_parameter() {
        assert_eq!(login_key(&request("/protected-api?login=jetbrains")).unwrap(), "jetbrains");
        assert!(login_key(&request("/protected-api")).is_err());
        assert!(login_key(&request("/protected-api?login=")).is_err());
    }

    #[test]
    fn protected_weight_depends_on_login() {
        let limiter = build_limiter(&crate::config::RateLimitSettings::default());
        let policy = limiter.policy(&RateLimitName::PROTECTED).unwrap();
        let req = request("/protected-api?login=x");

        assert_eq!((policy.weight)(&req, "jetbrains"), 1);
        assert_eq!((policy.weight)(&req, "someone"), 2);
    }

    #[test]
    fn purge_drops_only_idle_buckets() {
        let limiter = RateLimiter::new().register(RateLimitName::DEFAULT, RateLimitPolicy::global(minute(5)));
        let start = Instant::now();
        limiter.check(&RateLimitName::DEFAULT, "old", 1, start).unwrap();
        limiter.check(&RateLimitName::DEFAULT, "new", 1, start + Duration::from_secs(30)).unwrap();

        assert_eq!(limiter.purge_idle(start + Duration::from_secs(61)), 1);
        assert_eq!(limiter.bucket_count(), 1);
    }

    #[test]
    fn ceil_secs_rounds_up() {
        assert_eq!(ceil_secs(Duration::from_millis(1)), 1);
        assert_eq!(ceil_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ceil_secs(Duration::from_secs(60)), 60);
        assert_eq!(ceil_secs(Duration::ZERO), 1);
    }

    proptest! {
        /// Property: within one window, the total weight admitted never exceeds the limit.
        #[test]
        fn admitted_weight_never_exceeds_limit(
            limit in 1u32..50,
            weights in prop::collection::vec(1u32..5, 1..100)
        ) {
            let limiter = RateLimiter::new().register(RateLimitName::DEFAULT, RateLimitPolicy::global(minute(limit)));
            let now = Instant::now();

            let admitted: u32 = weights
                .iter()
                .filter(|w| matches!(
                    limiter.check(&RateLimitName::DEFAULT, "k", **w, now).unwrap(),
                    RateLimitDecision::Allowed { .. }
                ))
                .sum();

            prop_assert!(admitted <= limit);
        }
    }
}
