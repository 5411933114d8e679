//! Forward HTTP Proxy Library
//!
//! Accepts client connections, reads the first request to learn the origin,
//! then either tunnels (CONNECT) or forwards the request verbatim and relays
//! bytes both ways until a peer closes.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use lifecycle::Shutdown;
pub use proxy::ProxyServer;
