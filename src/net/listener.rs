//! TCP listener with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce the concurrency limit via semaphore
//! - Apply socket options (TCP keep-alive, no-delay)

use std::net::SocketAddr;
use std::sync::Arc;

use socket2::SockRef;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
    /// The connection limiter was closed.
    Closed,
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
            ListenerError::Closed => write!(f, "Connection limiter closed"),
        }
    }
}

impl std::error::Error for ListenerError {}

/// A bounded TCP listener that limits concurrent connections.
///
/// When the limit is reached, new connections wait in the kernel backlog until
/// a slot becomes available.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
    tcp_keepalive: bool,
}

impl Listener {
    /// Bind to `address` (`host:port`) with a connection limit.
    pub async fn bind(
        address: &str,
        max_connections: usize,
        tcp_keepalive: bool,
    ) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(ListenerError::Bind)?;
        Ok(Self::from_tcp(listener, max_connections, tcp_keepalive))
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(listener: TcpListener, max_connections: usize, tcp_keepalive: bool) -> Self {
        let max_connections = max_connections.clamp(1, Semaphore::MAX_PERMITS);

        if let Ok(local_addr) = listener.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections,
                tcp_keepalive,
                "Listener bound"
            );
        }

        Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            tcp_keepalive,
        }
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = Arc::clone(&self.connection_limit)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer_addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }
        if self.tcp_keepalive {
            if let Err(e) = SockRef::from(&stream).set_keepalive(true) {
                tracing::debug!(peer_addr = %addr, error = %e, "Failed to enable TCP keep-alive");
            }
        }

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Current free connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the slot is released back to the listener, even if the
/// connection task panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
