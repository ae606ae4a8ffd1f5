//! Shutdown coordination for the proxy and SSL redirector listeners.

use std::future::Future;
use std::time::Duration;

use axum_server::Handle;
use tokio::sync::watch;

/// Latched shutdown flag shared by every listener.
///
/// Unlike a broadcast, a listener that starts after the trigger still sees
/// it and stops immediately.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Stop every listener. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called, for
    /// `axum::serve(..).with_graceful_shutdown`.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let _ = rx.wait_for(|triggered| *triggered).await;
        }
    }

    /// An axum-server handle that starts draining on trigger.
    ///
    /// Open connections get `drain` to finish before they are closed.
    pub fn drain_handle(&self, drain: Duration) -> Handle {
        let handle = Handle::new();
        let draining = handle.clone();
        let signalled = self.signalled();
        tokio::spawn(async move {
            signalled.await;
            tracing::debug!(drain = ?drain, "Draining TLS connections");
            draining.graceful_shutdown(Some(drain));
        });
        handle
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
