//! Forward proxy core.
//!
//! # Data Flow
//! ```text
//! server.rs (accept, spawn one task per connection)
//!     → session.rs (parse request, resolve, connect, handshake)
//!     → relay.rs (full-duplex pump until first EOF or error)
//! ```
//!
//! # Design Decisions
//! - A session lives entirely inside its task; nothing is shared between sessions
//! - Every failure closes the connection without an HTTP error response
//! - No retries, no timeouts after the origin is connected

pub mod error;
pub mod relay;
pub mod server;
pub mod session;

pub use error::ProxyError;
pub use server::ProxyServer;
pub use session::{Session, SessionSettings, SessionSummary};
