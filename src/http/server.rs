//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing)
//! - Bind server to a plain or TLS listener
//! - Dispatch requests through the routing engine
//! - Hand forwarded requests to the streaming relay

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Redirect, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::RelaySettings;
use crate::http::relay::Relay;
use crate::lifecycle::Shutdown;
use crate::routing::{Dispatch, Dispatcher, Registry};

/// How long in-flight exchanges may drain on TLS shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub relay: Relay,
}

/// HTTP server for the reverse proxy.
pub struct ProxyServer {
    router: Router,
    registry: Arc<Registry>,
}

impl ProxyServer {
    /// Create a new proxy server over a frozen registry.
    pub fn new(registry: Arc<Registry>, settings: &RelaySettings) -> Self {
        let state = AppState {
            dispatcher: Arc::new(Dispatcher::new(registry.clone())),
            relay: Relay::new(settings),
        };

        let router = Self::build_router(state);
        Self { router, registry }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Every request target reaches the handler, including `*` and other
    /// forms that are not origin paths.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The configured router, for serving elsewhere or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve plain HTTP until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.registry.len(),
            "Proxy server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        tracing::info!("Proxy server stopped");
        Ok(())
    }

    /// Serve HTTPS until `shutdown` fires.
    pub async fn run_tls(
        self,
        listener: TcpListener,
        tls: RustlsConfig,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.registry.len(),
            "Proxy server starting with TLS"
        );

        axum_server::from_tcp_rustls(listener.into_std()?, tls)
            .handle(shutdown.drain_handle(TLS_DRAIN_TIMEOUT))
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Resolves the label, then redirects, rejects, or relays the request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %request.uri(),
        "Dispatching request"
    );

    let dispatch = state
        .dispatcher
        .dispatch(request.uri().path(), request.uri().query());

    match dispatch {
        Ok(Dispatch::Redirect(location)) => {
            tracing::debug!(request_id = %request_id, location = %location, "Redirecting");
            Redirect::to(&location).into_response()
        }
        Ok(Dispatch::Forward(forward)) => state.relay.forward(forward, request, &request_id).await,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                uri = %request.uri(),
                error = %e,
                "No route matched"
            );
            e.into_response()
        }
    }
}
