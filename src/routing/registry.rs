//! Backend registry.
//!
//! # Responsibilities
//! - Store backends by label
//! - Record the optional root redirect target
//! - Resolve a label to its backend
//!
//! # Design Decisions
//! - Built once through [`RegistryBuilder`], read-only afterwards
//! - Registration is append-only: a repeated label is an error, never an overwrite

use std::collections::HashMap;

use crate::backend::BackendEntry;
use crate::config::{RelaySettings, RouteSpec};

/// Label reserved for the root redirect target.
pub const ROOT_REDIRECT_LABEL: &str = "rootredirect";

/// Error type for registry construction.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("label '{0}' is already registered")]
    DuplicateLabel(String),

    #[error("label '{0}' is reserved")]
    ReservedLabel(String),

    #[error("invalid label '{0}': labels must be non-empty and must not contain '/'")]
    InvalidLabel(String),

    #[error("invalid root redirect target '{0}'")]
    InvalidRedirectTarget(String),

    #[error("invalid backend address for '{label}': {reason}")]
    InvalidAddress { label: String, reason: String },

    #[error("invalid path prefix '{prefix}' for '{label}'")]
    InvalidPathPrefix { label: String, prefix: String },
}

/// Immutable label → backend mapping.
#[derive(Debug, Default)]
pub struct Registry {
    backends: HashMap<String, BackendEntry>,
    root_redirect: Option<String>,
}

impl Registry {
    pub fn builder(settings: RelaySettings) -> RegistryBuilder {
        RegistryBuilder {
            settings,
            registry: Registry::default(),
        }
    }

    /// Register every route in order.
    pub fn from_routes(
        routes: &[RouteSpec],
        settings: &RelaySettings,
    ) -> Result<Self, RegistryError> {
        let mut builder = Registry::builder(settings.clone());
        for route in routes {
            match route {
                RouteSpec::Backend {
                    label,
                    host,
                    port,
                    path_prefix,
                } => builder.register(label, host, *port, path_prefix.as_deref())?,
                RouteSpec::RootRedirect(target) => builder.register_root_redirect(target)?,
            }
        }
        Ok(builder.build())
    }

    pub fn resolve(&self, label: &str) -> Option<&BackendEntry> {
        self.backends.get(label)
    }

    /// Target of the root redirect, without leading slash.
    pub fn root_redirect(&self) -> Option<&str> {
        self.root_redirect.as_deref()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Startup-time registration handle for a [`Registry`].
#[derive(Debug)]
pub struct RegistryBuilder {
    settings: RelaySettings,
    registry: Registry,
}

impl RegistryBuilder {
    /// Add a backend under `label`.
    pub fn register(
        &mut self,
        label: &str,
        host: &str,
        port: u16,
        path_prefix: Option<&str>,
    ) -> Result<(), RegistryError> {
        if label.is_empty() || label.contains('/') {
            return Err(RegistryError::InvalidLabel(label.to_string()));
        }
        if label == ROOT_REDIRECT_LABEL {
            return Err(RegistryError::ReservedLabel(label.to_string()));
        }
        if self.registry.backends.contains_key(label) {
            return Err(RegistryError::DuplicateLabel(label.to_string()));
        }

        let entry = BackendEntry::new(label, host, port, path_prefix, &self.settings)?;
        tracing::info!(
            label = %label,
            host = %entry.host(),
            port = entry.port(),
            path_prefix = entry.path_prefix().unwrap_or(""),
            max_connections = entry.pool().max_connections(),
            "Backend registered"
        );
        self.registry.backends.insert(label.to_string(), entry);
        Ok(())
    }

    /// Redirect requests for `/` to `/<target>`.
    pub fn register_root_redirect(&mut self, target: &str) -> Result<(), RegistryError> {
        if self.registry.root_redirect.is_some() {
            return Err(RegistryError::DuplicateLabel(ROOT_REDIRECT_LABEL.to_string()));
        }
        let target = target.trim_start_matches('/');
        if target.is_empty() {
            return Err(RegistryError::InvalidRedirectTarget(target.to_string()));
        }
        tracing::info!(target = %target, "Root redirect registered");
        self.registry.root_redirect = Some(target.to_string());
        Ok(())
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
