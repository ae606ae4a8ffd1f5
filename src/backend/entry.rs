//! Backend abstraction.

use std::str::FromStr;

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::Uri;

use crate::backend::pool::ConnectionPool;
use crate::config::RelaySettings;
use crate::routing::registry::RegistryError;

/// A single routable backend.
#[derive(Debug)]
pub struct BackendEntry {
    label: String,
    host: String,
    port: u16,
    /// Normalized without surrounding slashes.
    path_prefix: Option<String>,
    authority: Authority,
    pool: ConnectionPool,
}

impl BackendEntry {
    /// Create a backend, validating its address and path prefix.
    pub fn new(
        label: &str,
        host: &str,
        port: u16,
        path_prefix: Option<&str>,
        settings: &RelaySettings,
    ) -> Result<Self, RegistryError> {
        let authority_str = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };
        let authority =
            Authority::from_str(&authority_str).map_err(|e| RegistryError::InvalidAddress {
                label: label.to_string(),
                reason: e.to_string(),
            })?;

        let path_prefix = match path_prefix.map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => {
                if prefix.contains(|c: char| c == '?' || c == '#') {
                    return Err(RegistryError::InvalidPathPrefix {
                        label: label.to_string(),
                        prefix: prefix.to_string(),
                    });
                }
                PathAndQuery::from_str(&format!("/{}", prefix)).map_err(|_| {
                    RegistryError::InvalidPathPrefix {
                        label: label.to_string(),
                        prefix: prefix.to_string(),
                    }
                })?;
                Some(prefix.to_string())
            }
            _ => None,
        };

        Ok(Self {
            label: label.to_string(),
            host: host.to_string(),
            port,
            path_prefix,
            authority,
            pool: ConnectionPool::new(settings),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path_prefix(&self) -> Option<&str> {
        self.path_prefix.as_deref()
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Apply the prefix rewrite to the part of the path after the label.
    ///
    /// `remainder` starts with `/`; the result does too.
    pub fn rewrite_path(&self, remainder: &str) -> String {
        match &self.path_prefix {
            Some(prefix) => format!("/{}{}", prefix, remainder),
            None => remainder.to_string(),
        }
    }

    /// Absolute URI on this backend for an already rewritten path and query.
    pub fn upstream_uri(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}
