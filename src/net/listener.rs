//! TCP listener binding.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
#[error("failed to bind {addr}: {source}")]
pub struct ListenerError {
    pub addr: SocketAddr,
    #[source]
    pub source: std::io::Error,
}

/// Bind `port` on all IPv4 interfaces.
pub async fn bind(port: u16) -> Result<TcpListener, ListenerError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError { addr, source })?;

    tracing::info!(address = %addr, "Listener bound");
    Ok(listener)
}
