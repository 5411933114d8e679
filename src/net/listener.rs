//! TCP listener for client connections.
//!
//! # Responsibilities
//! - Bind to the configured loopback address and port
//! - Accept incoming TCP connections
//! - Optionally cap concurrent sessions via semaphore

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
    /// The session limit semaphore was closed.
    #[error("Session limit closed")]
    Closed,
}

/// A TCP listener with an optional limit on concurrent sessions.
///
/// With a limit set, `accept` waits for a free slot before taking the next
/// connection off the queue.
pub struct Listener {
    inner: TcpListener,
    session_limit: Option<Arc<Semaphore>>,
}

impl Listener {
    /// Bind to the configured host and port.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ListenerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        Ok(Self::from_tcp(listener, config.max_connections))
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(listener: TcpListener, max_connections: Option<usize>) -> Self {
        if let Ok(local_addr) = listener.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections = ?max_connections,
                "Listener bound"
            );
        }

        Self {
            inner: listener,
            session_limit: max_connections.map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    /// Accept a new connection, respecting the session limit.
    ///
    /// The returned permit must be held for the session's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, SessionPermit), ListenerError> {
        let permit = match &self.session_limit {
            Some(limit) => Some(
                Arc::clone(limit)
                    .acquire_owned()
                    .await
                    .map_err(|_| ListenerError::Closed)?,
            ),
            None => None,
        };

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = ?self.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, SessionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Free session slots, or `None` when unbounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.session_limit.as_ref().map(|s| s.available_permits())
    }
}

/// A session slot. Released when dropped, even if the session task panics.
#[derive(Debug)]
pub struct SessionPermit {
    _permit: Option<OwnedSemaphorePermit>,
}
