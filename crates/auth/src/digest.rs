//! HTTP Digest authentication (RFC 7616, `qop=auth`).
//!
//! Both `SHA-256` and `MD5` are offered, one challenge each, SHA-256 first.
//! A response without an `algorithm` parameter is checked as MD5.
//!
//! Nonces are issued by [`DigestAuthenticator::challenges`] and remembered
//! until they age past the configured TTL. A response computed over an unknown
//! or expired nonce is answered with a `stale=true` challenge.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use md5::Md5;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AuthError;
use crate::principal::DigestPrincipal;
use crate::users::constant_time_eq;

pub const QOP: &str = "auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha256,
    Md5,
}

impl DigestAlgorithm {
    /// Challenge order.
    pub const OFFERED: [Self; 2] = [Self::Sha256, Self::Md5];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Md5 => "MD5",
        }
    }

    /// Resolve the `algorithm` parameter of a response. Absent means MD5.
    pub fn from_param(param: Option<&str>) -> Result<Self, AuthError> {
        match param {
            None => Ok(Self::Md5),
            Some(name) if name.eq_ignore_ascii_case("SHA-256") => Ok(Self::Sha256),
            Some(name) if name.eq_ignore_ascii_case("MD5") => Ok(Self::Md5),
            Some(other) => Err(AuthError::malformed(format!("unsupported algorithm '{other}'"))),
        }
    }

    /// Lowercase hex digest of `input`.
    pub fn hash_hex(self, input: &str) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
            Self::Md5 => hex::encode(Md5::digest(input.as_bytes())),
        }
    }
}

/// HA1 = H(username:realm:password).
pub fn ha1(algorithm: DigestAlgorithm, username: &str, realm: &str, password: &str) -> String {
    algorithm.hash_hex(&format!("{username}:{realm}:{password}"))
}

/// Expected `response` value for a request.
///
/// With `qop` present the RFC 7616 form is used, otherwise the legacy
/// RFC 2069 form `H(HA1:nonce:HA2)`.
pub fn compute_response(
    algorithm: DigestAlgorithm,
    ha1: &str,
    nonce: &str,
    qop: Option<(&str, &str, &str)>,
    method: &str,
    uri: &str,
) -> String {
    let ha2 = algorithm.hash_hex(&format!("{method}:{uri}"));
    match qop {
        Some((qop, nc, cnonce)) => {
            algorithm.hash_hex(&format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}"))
        }
        None => algorithm.hash_hex(&format!("{ha1}:{nonce}:{ha2}")),
    }
}

/// Parsed `Authorization: Digest ...` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DigestCredentials {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub response: String,
    pub algorithm: Option<String>,
    pub qop: Option<String>,
    pub nc: Option<String>,
    pub cnonce: Option<String>,
    pub opaque: Option<String>,
}

impl DigestCredentials {
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("digest") {
            return Err(AuthError::MissingCredentials);
        }

        let params = parse_auth_params(rest)?;
        let required = |name: &str| {
            params
                .get(name)
                .cloned()
                .ok_or_else(|| AuthError::malformed(format!("missing '{name}'")))
        };

        Ok(Self {
            username: required("username")?,
            realm: required("realm")?,
            nonce: required("nonce")?,
            uri: required("uri")?,
            response: required("response")?.to_ascii_lowercase(),
            algorithm: params.get("algorithm").cloned(),
            qop: params.get("qop").cloned(),
            nc: params.get("nc").cloned(),
            cnonce: params.get("cnonce").cloned(),
            opaque: params.get("opaque").cloned(),
        })
    }
}

/// Split `k=v, k="quoted, v"` auth-params. Keys are lowercased.
fn parse_auth_params(input: &str) -> Result<HashMap<String, String>, AuthError> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.next() != Some('=') {
            return Err(AuthError::malformed(format!("parameter '{}' has no value", key.trim())));
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(AuthError::malformed("unterminated quoted string"));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        params.insert(key.trim().to_ascii_lowercase(), value);
    }

    Ok(params)
}

#[derive(Debug)]
pub struct DigestAuthenticator {
    realm: String,
    opaque: String,
    nonce_ttl: Duration,
    ha1: HashMap<(DigestAlgorithm, String), String>,
    nonces: DashMap<String, Instant>,
}

impl DigestAuthenticator {
    /// Build from plaintext credentials; only HA1 digests are retained,
    /// one per offered algorithm.
    pub fn new<I, U, P>(realm: impl Into<String>, users: I, nonce_ttl: Duration) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: AsRef<str>,
    {
        let realm = realm.into();
        let mut table = HashMap::new();
        for (user, password) in users {
            let user = user.into();
            for algorithm in DigestAlgorithm::OFFERED {
                let digest = ha1(algorithm, &user, &realm, password.as_ref());
                table.insert((algorithm, user.clone()), digest);
            }
        }

        Self {
            realm,
            opaque: Uuid::new_v4().simple().to_string(),
            nonce_ttl,
            ha1: table,
            nonces: DashMap::new(),
        }
    }

    /// Issue a fresh nonce and render one `WWW-Authenticate` value per
    /// offered algorithm.
    pub fn challenges(&self, stale: bool) -> Vec<String> {
        self.purge_expired();

        let nonce = Uuid::new_v4().simple().to_string();
        self.nonces.insert(nonce.clone(), Instant::now());

        DigestAlgorithm::OFFERED
            .iter()
            .map(|algorithm| {
                let mut value = format!(
                    "Digest realm=\"{}\", nonce=\"{}\", opaque=\"{}\", algorithm={}, qop=\"{}\"",
                    self.realm,
                    nonce,
                    self.opaque,
                    algorithm.name(),
                    QOP
                );
                if stale {
                    value.push_str(", stale=true");
                }
                value
            })
            .collect()
    }

    /// Verify a digest `Authorization` header for `method request_uri`.
    pub fn authenticate(
        &self,
        method: &str,
        request_uri: &str,
        header: Option<&str>,
    ) -> Result<DigestPrincipal, AuthError> {
        let creds = DigestCredentials::parse(header.ok_or(AuthError::MissingCredentials)?)?;

        if creds.username.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        if creds.realm != self.realm {
            return Err(AuthError::InvalidCredentials);
        }
        if creds.opaque.as_deref().is_some_and(|o| o != self.opaque) {
            return Err(AuthError::InvalidCredentials);
        }
        let algorithm = DigestAlgorithm::from_param(creds.algorithm.as_deref())?;
        if creds.uri != request_uri {
            return Err(AuthError::malformed("uri does not match request"));
        }

        let ha1 = self
            .ha1
            .get(&(algorithm, creds.username.clone()))
            .ok_or(AuthError::InvalidCredentials)?;

        let qop = match (&creds.qop, &creds.nc, &creds.cnonce) {
            (Some(qop), Some(nc), Some(cnonce)) if qop == QOP => Some((qop.as_str(), nc.as_str(), cnonce.as_str())),
            (Some(qop), _, _) if qop != QOP => {
                return Err(AuthError::malformed(format!("unsupported qop '{qop}'")));
            }
            (Some(_), _, _) => return Err(AuthError::malformed("qop requires nc and cnonce")),
            (None, _, _) => None,
        };

        let expected = compute_response(algorithm, ha1, &creds.nonce, qop, method, &creds.uri);
        if !constant_time_eq(expected.as_bytes(), creds.response.as_bytes()) {
            return Err(AuthError::InvalidCredentials);
        }

        if !self.nonce_is_fresh(&creds.nonce) {
            tracing::debug!(user = %creds.username, "digest nonce is stale");
            return Err(AuthError::StaleNonce);
        }

        Ok(DigestPrincipal {
            user_name: creds.username,
            realm: creds.realm,
        })
    }

    fn nonce_is_fresh(&self, nonce: &str) -> bool {
        self.nonces
            .get(nonce)
            .is_some_and(|issued| issued.elapsed() < self.nonce_ttl)
    }

    fn purge_expired(&self) {
        let ttl = self.nonce_ttl;
        self.nonces.retain(|_, issued| issued.elapsed() < ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REALM: &str = "Access to the '/' path";

    fn authenticator(ttl: Duration) -> DigestAuthenticator {
        DigestAuthenticator::new(REALM, [("jetbrains", "foobar")], ttl)
    }

    fn params_of(challenge: &str) -> HashMap<String, String> {
        parse_auth_params(challenge.trim_start_matches("Digest ")).unwrap()
    }

    fn nonce_from(auth: &DigestAuthenticator) -> String {
        params_of(&auth.challenges(false)[0])["nonce"].clone()
    }

    /// `algorithm` is the hash actually used; `advertised` is what the header claims.
    fn header(
        algorithm: DigestAlgorithm,
        advertised: Option<&str>,
        user: &str,
        password: &str,
        nonce: &str,
        uri: &str,
    ) -> String {
        let response = compute_response(
            algorithm,
            &ha1(algorithm, user, REALM, password),
            nonce,
            Some(("auth", "00000001", "c0ffee")),
            "GET",
            uri,
        );
        let algorithm_param = advertised
            .map(|a| format!("algorithm={a}, "))
            .unwrap_or_default();
        format!(
            "Digest username=\"{user}\", realm=\"{REALM}\", nonce=\"{nonce}\", uri=\"{uri}\", \
             {algorithm_param}qop=auth, nc=00000001, cnonce=\"c0ffee\", response=\"{response}\""
        )
    }

    #[test]
    fn hash_vectors() {
        assert_eq!(
            DigestAlgorithm::Sha256.hash_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(DigestAlgorithm::Md5.hash_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn parses_quoted_values_with_commas() {
        let params = parse_auth_params(r#"a="x, y", b=token, c="q\"d""#).unwrap();
        assert_eq!(params["a"], "x, y");
        assert_eq!(params["b"], "token");
        assert_eq!(params["c"], "q\"d");
    }

    #[test]
    fn challenges_offer_sha256_then_md5_with_one_nonce() {
        let challenges = authenticator(Duration::from_secs(60)).challenges(false);
        assert_eq!(challenges.len(), 2);

        let first = params_of(&challenges[0]);
        let second = params_of(&challenges[1]);
        assert_eq!(first["algorithm"], "SHA-256");
        assert_eq!(second["algorithm"], "MD5");
        assert_eq!(first["nonce"], second["nonce"]);
    }

    #[test]
    fn sha256_response_yields_principal() {
        let auth = authenticator(Duration::from_secs(60));
        let nonce = nonce_from(&auth);
        let h = header(DigestAlgorithm::Sha256, Some("SHA-256"), "jetbrains", "foobar", &nonce, "/auth/digest-login");

        let principal = auth.authenticate("GET", "/auth/digest-login", Some(&h)).unwrap();

        assert_eq!(principal.user_name, "jetbrains");
        assert_eq!(principal.realm, REALM);
    }

    #[test]
    fn md5_response_yields_principal() {
        let auth = authenticator(Duration::from_secs(60));
        let nonce = nonce_from(&auth);
        let h = header(DigestAlgorithm::Md5, Some("MD5"), "jetbrains", "foobar", &nonce, "/x");

        assert_eq!(auth.authenticate("GET", "/x", Some(&h)).unwrap().user_name, "jetbrains");
    }

    #[test]
    fn absent_algorithm_is_checked_as_md5() {
        let auth = authenticator(Duration::from_secs(60));
        let nonce = nonce_from(&auth);

        let md5 = header(DigestAlgorithm::Md5, None, "jetbrains", "foobar", &nonce, "/x");
        assert!(auth.authenticate("GET", "/x", Some(&md5)).is_ok());

        let sha = header(DigestAlgorithm::Sha256, None, "jetbrains", "foobar", &nonce, "/x");
        assert_eq!(auth.authenticate("GET", "/x", Some(&sha)), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn unknown_algorithm_is_malformed() {
        let auth = authenticator(Duration::from_secs(60));
        let nonce = nonce_from(&auth);
        let h = header(DigestAlgorithm::Md5, Some("MD5-sess"), "jetbrains", "foobar", &nonce, "/x");

        assert!(matches!(
            auth.authenticate("GET", "/x", Some(&h)),
            Err(AuthError::MalformedCredentials(_))
        ));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let auth = authenticator(Duration::from_secs(60));
        let nonce = nonce_from(&auth);
        let h = header(DigestAlgorithm::Sha256, Some("SHA-256"), "jetbrains", "nope", &nonce, "/x");

        assert_eq!(auth.authenticate("GET", "/x", Some(&h)), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn empty_username_is_rejected() {
        let auth = authenticator(Duration::from_secs(60));
        let nonce = nonce_from(&auth);
        let h = header(DigestAlgorithm::Md5, Some("MD5"), "", "foobar", &nonce, "/x");

        assert_eq!(auth.authenticate("GET", "/x", Some(&h)), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn foreign_opaque_is_rejected() {
        let auth = authenticator(Duration::from_secs(60));
        let challenge = params_of(&auth.challenges(false)[0]);
        let h = header(DigestAlgorithm::Sha256, Some("SHA-256"), "jetbrains", "foobar", &challenge["nonce"], "/x");

        let echoed = format!("{h}, opaque=\"{}\"", challenge["opaque"]);
        assert!(auth.authenticate("GET", "/x", Some(&echoed)).is_ok());

        let foreign = format!("{h}, opaque=\"not-ours\"");
        assert_eq!(auth.authenticate("GET", "/x", Some(&foreign)), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn unknown_nonce_is_stale() {
        let auth = authenticator(Duration::from_secs(60));
        let h = header(DigestAlgorithm::Sha256, Some("SHA-256"), "jetbrains", "foobar", "forged", "/x");

        assert_eq!(auth.authenticate("GET", "/x", Some(&h)), Err(AuthError::StaleNonce));
    }

    #[test]
    fn expired_nonce_is_stale() {
        let auth = authenticator(Duration::ZERO);
        let nonce = nonce_from(&auth);
        let h = header(DigestAlgorithm::Md5, Some("MD5"), "jetbrains", "foobar", &nonce, "/x");

        assert_eq!(auth.authenticate("GET", "/x", Some(&h)), Err(AuthError::StaleNonce));
    }

    #[test]
    fn uri_mismatch_is_rejected() {
        let auth = authenticator(Duration::from_secs(60));
        let nonce = nonce_from(&auth);
        let h = header(DigestAlgorithm::Sha256, Some("SHA-256"), "jetbrains", "foobar", &nonce, "/x");

        assert!(matches!(
            auth.authenticate("GET", "/other", Some(&h)),
            Err(AuthError::MalformedCredentials(_))
        ));
    }

    #[test]
    fn stale_challenge_sets_flag() {
        let auth = authenticator(Duration::from_secs(60));
        assert!(auth.challenges(true).iter().all(|c| c.ends_with("stale=true")));
        assert!(auth.challenges(false).iter().all(|c| !c.contains("stale")));
    }
}
