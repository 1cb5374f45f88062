use std::sync::Arc;

use turnstile_auth::{
    BasicAuthenticator, BearerAuthenticator, DigestAuthenticator, HashedUserTable, JwtConfig,
    JwtManager,
};
use turnstile_core::{CustomerStore, OrderStore};

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::AuthState;
use crate::rate_limit::{self, RateLimiter};

/// Realm shared by the basic, digest and bearer schemes.
pub const ROOT_REALM: &str = "Access to the '/' path";

/// Shared handles injected into every handler.
pub struct AppServices {
    pub customers: CustomerStore,
    pub orders: OrderStore,
    pub auth: AuthState,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: Arc<Metrics>,
}

pub fn build_services(config: &AppConfig) -> Result<AppServices, prometheus::Error> {
    let users = HashedUserTable::new(
        config.password_salt.clone(),
        config.users.iter().map(|(u, p)| (u.clone(), p.clone())),
    );

    let auth = AuthState {
        basic: Arc::new(BasicAuthenticator::new(ROOT_REALM, users)),
        digest: Arc::new(DigestAuthenticator::new(
            ROOT_REALM,
            config.users.iter().map(|(u, p)| (u.clone(), p.as_str())),
            config.digest_nonce_ttl,
        )),
        bearer: Arc::new(BearerAuthenticator::new(
            ROOT_REALM,
            config.bearer_tokens.iter().cloned(),
        )),
        jwt: JwtManager::new(JwtConfig::new(config.jwt_secret.clone()).with_ttl(config.jwt_ttl)),
    };

    tracing::debug!(
        users = config.users.len(),
        bearer_tokens = config.bearer_tokens.len(),
        "credential tables loaded"
    );

    Ok(AppServices {
        customers: CustomerStore::new(),
        orders: OrderStore::default(),
        auth,
        rate_limiter: Arc::new(rate_limit::build_limiter(&config.rate_limits)),
        metrics: Arc::new(Metrics::new()?),
    })
}
