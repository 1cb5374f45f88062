//! Self-signed keystore for the HTTPS listener.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "key.pem";

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate generation failed: {0}")]
    Generate(#[from] rcgen::Error),

    #[error("keystore i/o at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Location of a PEM certificate/key pair on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystore {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl Keystore {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cert_path: dir.join(CERT_FILE),
            key_path: dir.join(KEY_FILE),
        }
    }

    pub async fn rustls_config(&self) -> Result<RustlsConfig, TlsError> {
        RustlsConfig::from_pem_file(&self.cert_path, &self.key_path)
            .await
            .map_err(|source| TlsError::Io {
                path: self.cert_path.clone(),
                source,
            })
    }
}

/// Generate a certificate valid for `domains` and write it into `dir`.
///
/// Entries that parse as IP addresses become IP SANs, the rest DNS SANs.
/// Existing files are overwritten.
pub fn generate_self_signed(dir: &Path, domains: &[String]) -> Result<Keystore, TlsError> {
    let certified = rcgen::generate_simple_self_signed(domains.to_vec())?;

    std::fs::create_dir_all(dir).map_err(|source| TlsError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let keystore = Keystore::in_dir(dir);
    write(&keystore.cert_path, certified.cert.pem())?;
    write(&keystore.key_path, certified.key_pair.serialize_pem())?;

    tracing::info!(
        cert = %keystore.cert_path.display(),
        domains = ?domains,
        "generated self-signed certificate"
    );
    Ok(keystore)
}

fn write(path: &Path, contents: String) -> Result<(), TlsError> {
    std::fs::write(path, contents).map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_pem_pair() {
        let dir = tempfile::tempdir().unwrap();
        let domains = vec!["127.0.0.1".to_string(), "localhost".to_string()];

        let keystore = generate_self_signed(&dir.path().join("keystore"), &domains).unwrap();

        let cert = std::fs::read_to_string(&keystore.cert_path).unwrap();
        let key = std::fs::read_to_string(&keystore.key_path).unwrap();
        assert!(cert.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(key.contains("PRIVATE KEY"));
    }

    #[tokio::test]
    async fn generated_pair_loads_into_rustls() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let dir = tempfile::tempdir().unwrap();

        let keystore = generate_self_signed(dir.path(), &["localhost".to_string()]).unwrap();
        assert!(keystore.rustls_config().await.is_ok());
    }
}
