//! Hashed username/password table.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::principal::UserIdPrincipal;

/// Usernames mapped to salted SHA-256 password digests.
///
/// Plaintext passwords are only seen at construction time.
#[derive(Debug, Clone)]
pub struct HashedUserTable {
    salt: String,
    table: HashMap<String, [u8; 32]>,
}

impl HashedUserTable {
    pub fn new<I, U, P>(salt: impl Into<String>, users: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: AsRef<str>,
    {
        let salt = salt.into();
        let table = users
            .into_iter()
            .map(|(user, password)| {
                let digest = salted_digest(&salt, password.as_ref());
                (user.into(), digest)
            })
            .collect();
        Self { salt, table }
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Option<UserIdPrincipal> {
        let expected = self.table.get(username)?;
        let actual = salted_digest(&self.salt, password);
        if constant_time_eq(expected, &actual) {
            Some(UserIdPrincipal::new(username))
        } else {
            None
        }
    }
}

fn salted_digest(salt: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
