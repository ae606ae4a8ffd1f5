//! Configuration loading from disk.
//!
//! The proxy is configured with a Java properties file, read with the
//! `java-properties` crate so separators, continuation lines and escapes
//! behave as they do in Java. Entries are kept in file order and duplicates
//! are preserved so that a label defined twice is reported by the registry
//! instead of silently overwritten.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use java_properties::{PropertiesError, PropertiesIter};

/// Error type for configuration loading and interpretation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: PropertiesError,
    },

    #[error("malformed port number for '{key}': '{value}'")]
    InvalidPort { key: String, value: String },

    #[error("malformed backend definition for '{label}': '{value}' ({reason})")]
    InvalidBackend {
        label: String,
        value: String,
        reason: String,
    },

    #[error("error parsing host url: '{value}' ({reason})")]
    InvalidRedirectUrl { value: String, reason: String },

    #[error("missing SSL redirect parameter '{0}'")]
    MissingRedirectParameter(&'static str),
}

/// Load the ordered key/value pairs of a properties file.
pub fn load_properties(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_properties(BufReader::new(file)).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Read properties into ordered pairs, skipping entries with an empty key.
pub fn read_properties<R: Read>(input: R) -> Result<Vec<(String, String)>, PropertiesError> {
    let mut pairs = Vec::new();
    PropertiesIter::new(input).read_into(|key, value| {
        if !key.is_empty() {
            pairs.push((key, value));
        }
    })?;
    Ok(pairs)
}
