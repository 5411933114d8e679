//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sessions and the accept loop produce:
//!     → logging.rs (structured log events, one span per session)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
