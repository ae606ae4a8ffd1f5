//! Outbound connection pool.

use std::sync::Arc;

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::RelaySettings;

/// The pool's semaphore was closed; no further exchanges can start.
#[derive(Debug, thiserror::Error)]
#[error("connection pool is closed")]
pub struct PoolClosed;

/// Persistent connections to a single backend, bounded in concurrency.
///
/// hyper-util keeps idle keep-alive connections per authority; the semaphore
/// caps how many exchanges may be in flight at once.
#[derive(Debug)]
pub struct ConnectionPool {
    client: Client<HttpConnector, Body>,
    permits: Arc<Semaphore>,
    max_connections: usize,
}

impl ConnectionPool {
    pub fn new(settings: &RelaySettings) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(settings.connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(settings.max_connections)
            .build(connector);

        Self {
            client,
            permits: Arc::new(Semaphore::new(settings.max_connections)),
            max_connections: settings.max_connections,
        }
    }

    /// Wait for a free slot. The slot is released when the lease is dropped.
    pub async fn acquire(&self) -> Result<ConnectionLease, PoolClosed> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolClosed)?;
        Ok(ConnectionLease { _permit: permit })
    }

    /// The pooled HTTP client.
    pub fn client(&self) -> &Client<HttpConnector, Body> {
        &self.client
    }

    /// Number of exchanges currently holding a lease.
    pub fn in_use(&self) -> usize {
        self.max_connections - self.permits.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A slot in a [`ConnectionPool`], held for the lifetime of one exchange.
#[derive(Debug)]
pub struct ConnectionLease {
    _permit: OwnedSemaphorePermit,
}
