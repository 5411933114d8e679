//! Per-connection proxy pipeline.
//!
//! # Data Flow
//! ```text
//! client bytes → RequestParser (until a terminal event)
//!     → resolve(target) → connector::connect
//!     → CONNECT: "200 OK" to client, trailing bytes to origin
//!       other:   whole request buffer to origin
//!     → relay until either side closes
//! ```
//!
//! A session is owned by exactly one task and never shared. Both streams
//! are dropped (closed) when `run` returns, whatever the outcome.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::ProxyConfig;
use crate::http::parser::{Event, RequestHead, RequestParser};
use crate::http::target::{self, TargetAddr};
use crate::net::connection::SessionId;
use crate::net::connector;
use crate::proxy::error::{Direction, ProxyError, Result};
use crate::proxy::relay::{self, RelayOutcome};

/// The only response the proxy ever synthesizes.
pub const CONNECT_ESTABLISHED: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n";

/// Tunables shared by every session, copied into each one.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Read size for the request head and for each relay chunk.
    pub buffer_size: usize,
    pub max_head_bytes: usize,
    /// Zero means no timeout.
    pub connect_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ProxyConfig::default())
    }
}

impl From<&ProxyConfig> for SessionSettings {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            buffer_size: config.relay.buffer_size,
            max_head_bytes: config.relay.max_head_bytes,
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
        }
    }
}

/// How the session reached the relay phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// CONNECT tunnel.
    Tunnel,
    /// Plain request forwarded verbatim.
    Forward,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Tunnel => "tunnel",
            Mode::Forward => "forward",
        }
    }
}

/// What a session did before it closed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub mode: Mode,
    pub origin: TargetAddr,
    pub relay: RelayOutcome,
}

/// State for one accepted client connection.
#[derive(Debug)]
pub struct Session<S> {
    id: SessionId,
    client: S,
    /// Every byte read from the client while parsing.
    buffer: Vec<u8>,
    /// Index into `buffer` where CONNECT tunnel payload starts.
    boundary: Option<usize>,
    settings: SessionSettings,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(id: SessionId, client: S, settings: SessionSettings) -> Self {
        Self {
            id,
            client,
            buffer: Vec::new(),
            boundary: None,
            settings,
        }
    }

    /// Drive the session to completion.
    pub async fn run(mut self) -> Result<SessionSummary> {
        let head = self.read_request().await?;
        tracing::debug!(method = %head.method, target = %head.target, "Request parsed");

        let origin_addr = target::resolve(&head.target)?;
        tracing::info!(
            session_id = %self.id,
            method = %head.method,
            origin = %origin_addr,
            "Connecting to origin"
        );

        let mut origin = connector::connect(&origin_addr, self.settings.connect_timeout)
            .await
            .map_err(|source| ProxyError::Connect {
                target: origin_addr.to_string(),
                source,
            })?;

        let mode = self.handshake(&head, &mut origin).await?;
        let relay = relay::relay(&mut self.client, &mut origin, self.settings.buffer_size).await?;

        Ok(SessionSummary {
            mode,
            origin: origin_addr,
            relay,
        })
    }

    /// Read and parse until the request head (and any body) is complete.
    async fn read_request(&mut self) -> Result<RequestHead> {
        let mut parser = RequestParser::new(self.settings.max_head_bytes);
        let mut chunk = vec![0u8; self.settings.buffer_size];

        loop {
            let n = self.client.read(&mut chunk).await?;
            if n == 0 {
                return Err(ProxyError::ClientClosed);
            }
            let chunk_start = self.buffer.len();
            self.buffer.extend_from_slice(&chunk[..n]);

            match parser.feed(&chunk[..n]) {
                Event::NeedMore => continue,
                Event::HeaderComplete { head } => return Ok(head),
                Event::UpgradeRequested { head, offset } => {
                    tracing::trace!(offset, "CONNECT head complete");
                    self.boundary = Some(chunk_start + offset);
                    return Ok(head);
                }
                Event::ParseError(e) => return Err(e.into()),
            }
        }
    }

    /// Write the first bytes of the relay phase.
    ///
    /// The accumulated buffer is consumed here and never looked at again.
    async fn handshake(&mut self, head: &RequestHead, origin: &mut TcpStream) -> Result<Mode> {
        let buffer = std::mem::take(&mut self.buffer);

        if head.is_connect() {
            self.client.write_all(CONNECT_ESTABLISHED).await?;
            self.client.flush().await?;

            let boundary = self.boundary.take().unwrap_or(buffer.len());
            let trailing = buffer.get(boundary..).unwrap_or_default();
            if !trailing.is_empty() {
                tracing::debug!(bytes = trailing.len(), "Forwarding early tunnel payload");
                write_origin(origin, trailing).await?;
            }
            Ok(Mode::Tunnel)
        } else {
            write_origin(origin, &buffer).await?;
            Ok(Mode::Forward)
        }
    }
}

async fn write_origin(origin: &mut TcpStream, bytes: &[u8]) -> Result<()> {
    origin
        .write_all(bytes)
        .await
        .map_err(|source| ProxyError::Relay {
            direction: Direction::ClientToOrigin,
            source,
        })
}
