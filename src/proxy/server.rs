//! Accept loop and per-connection dispatch.
//!
//! # Responsibilities
//! - Accept client connections until shutdown is signalled
//! - Spawn one task per connection running a [`Session`]
//! - Log and count each session's outcome
//!
//! Sessions already running are left alone on shutdown; only accepting stops.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::net::connection::{SessionGuard, SessionTracker};
use crate::net::listener::{Listener, ListenerError, SessionPermit};
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::session::{Session, SessionSettings};

/// Pause after a failed accept so a persistent error (e.g. EMFILE) cannot spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Forward proxy server.
pub struct ProxyServer {
    config: ProxyConfig,
    tracker: SessionTracker,
}

impl ProxyServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            tracker: SessionTracker::new(),
        }
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let settings = SessionSettings::from(&self.config);
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Proxy accepting connections");
        }

        // A dropped coordinator means nobody can ask for shutdown any more.
        let mut shutdown_open = true;

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                signal = shutdown.recv(), if shutdown_open => {
                    if let Err(broadcast::error::RecvError::Closed) = signal {
                        shutdown_open = false;
                        continue;
                    }
                    tracing::info!(
                        active_sessions = self.tracker.active_count(),
                        "Shutdown signal received, no longer accepting"
                    );
                    break;
                }
            };

            match accepted {
                Ok((stream, peer, permit)) => {
                    self.dispatch(stream, peer, permit, settings);
                }
                Err(ListenerError::Accept(e)) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    fn dispatch(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: SessionPermit,
        settings: SessionSettings,
    ) {
        let guard = self.tracker.track();
        let span = tracing::info_span!("session", session_id = %guard.id(), peer_addr = %peer);

        tokio::spawn(
            async move {
                tracing::debug!("Connection established");
                run_session(stream, guard, settings).await;
                drop(permit);
            }
            .instrument(span),
        );
    }
}

async fn run_session(stream: TcpStream, guard: SessionGuard, settings: SessionSettings) {
    match Session::new(guard.id(), stream, settings).run().await {
        Ok(summary) => {
            metrics::session_completed(summary.mode);
            tracing::info!(
                mode = summary.mode.as_str(),
                origin = %summary.origin,
                closed_by = %summary.relay.closed_by,
                client_to_origin = summary.relay.client_to_origin,
                origin_to_client = summary.relay.origin_to_client,
                "Session closed"
            );
        }
        Err(ProxyError::ClientClosed) => {
            tracing::debug!("Client closed before sending a request");
        }
        Err(e) => {
            metrics::session_error(e.kind());
            tracing::warn!(kind = e.kind(), error = %e, "Session aborted");
        }
    }
}
