//! Startup orchestration.
//!
//! # Responsibilities
//! - Freeze the registry from configured routes
//! - Deploy the SSL redirector when configured
//! - Load the keystore and bind the proxy listener
//!
//! # Design Decisions
//! - Duplicate labels, an unusable keystore or an unbindable proxy port are fatal
//! - The SSL redirector failing to start only loses that listener

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{load_properties, ConfigError, ProxySettings, RedirectConfig};
use crate::http::{ProxyServer, SslRedirector};
use crate::lifecycle::Shutdown;
use crate::net::{self, KeystoreConfig, ListenerError, TlsError};
use crate::routing::{Registry, RegistryError};

/// Fatal startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read the properties file and interpret it.
pub fn load_settings(path: &Path) -> Result<ProxySettings, StartupError> {
    let pairs = load_properties(path)?;
    let settings = ProxySettings::from_pairs(&pairs);

    tracing::info!(
        config = %path.display(),
        port = settings.port,
        routes = settings.routes.len(),
        ssl_redirect = settings.ssl_redirect.is_some(),
        max_connections = settings.relay.max_connections,
        "Configuration loaded"
    );
    Ok(settings)
}

/// Start every component and serve until `shutdown` fires.
pub async fn run(
    settings: ProxySettings,
    keystore: Option<KeystoreConfig>,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    let registry = Arc::new(Registry::from_routes(&settings.routes, &settings.relay)?);
    if registry.is_empty() {
        tracing::warn!("No backends registered, every proxied request will be answered with 404");
    }

    let redirector = settings
        .ssl_redirect
        .clone()
        .map(|config| spawn_redirector(config, shutdown.clone()));

    let tls = match &keystore {
        Some(keystore) => {
            tracing::info!(keystore = %keystore.path.display(), "[jks] using keystore");
            Some(net::load_keystore(keystore).await?)
        }
        None => {
            tracing::info!("[jks] no keystore provided");
            None
        }
    };

    let listener = net::bind(settings.port).await?;
    let server = ProxyServer::new(registry, &settings.relay);
    match tls {
        Some(tls) => server.run_tls(listener, tls, shutdown.clone()).await?,
        None => server.run(listener, shutdown.clone()).await?,
    }
    if !shutdown.is_triggered() {
        tracing::warn!("Proxy listener stopped without a shutdown signal");
        shutdown.trigger();
    }

    if let Some(handle) = redirector {
        let _ = handle.await;
    }
    Ok(())
}

/// Deploy the SSL redirector on its own listener.
///
/// Failures are logged; they never reach the proxy.
pub fn spawn_redirector(
    config: RedirectConfig,
    shutdown: Shutdown,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let listener = match net::bind(config.origin_port).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start SSL redirector");
                return;
            }
        };
        if let Err(e) = SslRedirector::new(config).run(listener, shutdown).await {
            tracing::error!(error = %e, "SSL redirector failed");
        }
    })
}
