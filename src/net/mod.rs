//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, optional session limit)
//!     → connection.rs (session ID, live-session tracking)
//!     → hand off to the proxy session
//!
//! Outgoing:
//!     proxy session → connector.rs → origin TCP stream
//! ```

pub mod connection;
pub mod connector;
pub mod listener;
