//! TLS keystore loading.
//!
//! The keystore is a PEM bundle: the certificate chain followed by an
//! unencrypted private key. The passphrase only gates TLS activation,
//! since rustls cannot read passphrase-protected keys, so it is not kept.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;

/// Keystore location, taken from `jkspath` when `jkspass` is also set.
#[derive(Debug, Clone)]
pub struct KeystoreConfig {
    pub path: PathBuf,
}

impl KeystoreConfig {
    /// Both values are required; either one missing means plain HTTP.
    pub fn from_parts(path: Option<PathBuf>, passphrase: Option<String>) -> Option<Self> {
        match (path, passphrase) {
            (Some(path), Some(_)) => Some(Self { path }),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("keystore {path} not readable: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("keystore {0} contains no certificate")]
    NoCertificate(String),

    #[error("keystore {0} contains no unencrypted private key")]
    NoPrivateKey(String),
}

/// Load a keystore into a rustls server configuration.
pub async fn load_keystore(keystore: &KeystoreConfig) -> Result<RustlsConfig, TlsError> {
    let path_str = keystore.path.display().to_string();

    let (certs, key) = read_pem_bundle(&keystore.path).map_err(|source| TlsError::Io {
        path: path_str.clone(),
        source,
    })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificate(path_str));
    }
    let Some(key) = key else {
        return Err(TlsError::NoPrivateKey(path_str));
    };

    tracing::info!(
        keystore = %path_str,
        certificates = certs.len(),
        "Keystore loaded"
    );
    RustlsConfig::from_der(certs, key)
        .await
        .map_err(|source| TlsError::Io {
            path: path_str,
            source,
        })
}

fn read_pem_bundle(path: &Path) -> Result<(Vec<Vec<u8>>, Option<Vec<u8>>), std::io::Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let certs = rustls_pemfile::certs(&mut reader)
        .map(|cert| cert.map(|der| der.as_ref().to_vec()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut reader = BufReader::new(File::open(path)?);
    let key = rustls_pemfile::private_key(&mut reader)?.map(|key| key.secret_der().to_vec());

    Ok((certs, key))
}
