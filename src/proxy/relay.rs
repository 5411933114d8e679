//! Full-duplex byte relay between client and origin.
//!
//! # Data Flow
//! ```text
//! client ──read──▶ relay ──write──▶ origin
//! client ◀─write── relay ◀──read─── origin
//! ```
//!
//! One task waits on both reads at once and services whichever is ready.
//! The first EOF or I/O error on either side ends the relay; there is no
//! half-closed continuation and no timeout.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::observability::metrics;
use crate::proxy::error::{Direction, ProxyError};

/// Peer whose EOF ended the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    Client,
    Origin,
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Peer::Client => write!(f, "client"),
            Peer::Origin => write!(f, "origin"),
        }
    }
}

/// Summary of a relay that ended with a clean EOF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    pub closed_by: Peer,
    pub client_to_origin: u64,
    pub origin_to_client: u64,
}

/// Pump bytes in both directions until one side closes or fails.
///
/// Each read takes at most `chunk_size` bytes and is written unmodified to the
/// other stream before that stream is read again. Callers drop both streams
/// afterwards regardless of the result.
pub async fn relay<C, O>(
    client: &mut C,
    origin: &mut O,
    chunk_size: usize,
) -> Result<RelayOutcome, ProxyError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    O: AsyncRead + AsyncWrite + Unpin,
{
    let mut client_buf = vec![0u8; chunk_size];
    let mut origin_buf = vec![0u8; chunk_size];
    let mut client_to_origin = 0u64;
    let mut origin_to_client = 0u64;

    let closed_by = loop {
        tokio::select! {
            read = client.read(&mut client_buf) => {
                let n = read.map_err(|source| ProxyError::Relay {
                    direction: Direction::ClientToOrigin,
                    source,
                })?;
                if n == 0 {
                    break Peer::Client;
                }
                origin
                    .write_all(&client_buf[..n])
                    .await
                    .map_err(|source| ProxyError::Relay {
                        direction: Direction::ClientToOrigin,
                        source,
                    })?;
                client_to_origin += n as u64;
                metrics::relayed(Direction::ClientToOrigin, n);
            }
            read = origin.read(&mut origin_buf) => {
                let n = read.map_err(|source| ProxyError::Relay {
                    direction: Direction::OriginToClient,
                    source,
                })?;
                if n == 0 {
                    break Peer::Origin;
                }
                client
                    .write_all(&origin_buf[..n])
                    .await
                    .map_err(|source| ProxyError::Relay {
                        direction: Direction::OriginToClient,
                        source,
                    })?;
                origin_to_client += n as u64;
                metrics::relayed(Direction::OriginToClient, n);
            }
        }
    };

    Ok(RelayOutcome {
        closed_by,
        client_to_origin,
        origin_to_client,
    })
}
