//! Session error taxonomy.
//!
//! Every variant is fatal to its own session and to nothing else. None of
//! them produce an HTTP error response; the client only sees the connection
//! close.

use thiserror::Error;

use crate::http::parser::ParseError;
use crate::http::target::ResolveError;

/// Relay direction, used to label errors and byte counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToOrigin,
    OriginToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToOrigin => "client_to_origin",
            Direction::OriginToClient => "origin_to_client",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that terminate a proxy session.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Client hung up before sending a complete request.
    #[error("client closed before the request was complete")]
    ClientClosed,

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("resolution failure: {0}")]
    Resolve(#[from] ResolveError),

    #[error("upstream connection failed to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("relay failed ({direction}): {source}")]
    Relay {
        direction: Direction,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Short label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::ClientClosed => "client_closed",
            ProxyError::Parse(_) => "parse",
            ProxyError::Resolve(_) => "resolution",
            ProxyError::Connect { .. } => "connect",
            ProxyError::Relay { .. } => "relay",
            ProxyError::Io(_) => "io",
        }
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, ProxyError>;
