//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl+C → Shutdown::trigger → accept loop stops
//! ```
//!
//! In-flight sessions are not cancelled; they end when a peer closes.

pub mod shutdown;

pub use shutdown::Shutdown;
