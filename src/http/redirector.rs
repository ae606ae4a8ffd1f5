//! SSL redirector.
//!
//! Answers every request on its own listener with a `303` to the HTTPS
//! equivalent URL. Shares nothing with the proxy besides the shutdown signal.

use std::sync::Arc;

use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::RedirectConfig;
use crate::lifecycle::Shutdown;
use crate::routing::dispatcher::build_uri;

/// Redirects plaintext traffic to `https://<externalHost>:<destinationPort>`.
#[derive(Debug, Clone)]
pub struct SslRedirector {
    config: Arc<RedirectConfig>,
}

impl SslRedirector {
    pub fn new(config: RedirectConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// HTTPS location for a request path and query.
    pub fn location(&self, path: &str, query: Option<&str>) -> String {
        let tail = build_uri(path, query);
        let slash = if tail.starts_with('/') { "" } else { "/" };
        format!(
            "https://{}:{}{}{}",
            self.config.external_host, self.config.destination_port, slash, tail
        )
    }

    pub fn router(&self) -> Router {
        Router::new()
            .fallback(redirect_handler)
            .with_state(self.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            address = %listener.local_addr()?,
            external_host = %self.config.external_host,
            destination_port = self.config.destination_port,
            "SSL redirector started"
        );

        axum::serve(listener, self.router().into_make_service())
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        tracing::info!("SSL redirector stopped");
        Ok(())
    }
}

async fn redirect_handler(State(redirector): State<SslRedirector>, uri: Uri) -> Response {
    let location = redirector.location(uri.path(), uri.query());
    tracing::debug!(location = %location, "Redirecting to HTTPS");
    Redirect::to(&location).into_response()
}
