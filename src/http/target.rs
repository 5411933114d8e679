//! Request target resolution.
//!
//! Turns the on-wire request target into the origin's host and port.
//! The scheme detection is a literal substring heuristic:
//! a target mentioning `https` anywhere is parsed as an absolute URI,
//! a target without `://` is treated as a bare authority and gets `https://` prepended,
//! anything else is parsed as the absolute URI it claims to be.

use thiserror::Error;
use url::{Host, Url};

/// Resolved origin address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddr {
    /// Hostname or IP literal (IPv6 without brackets).
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Errors raised while resolving a request target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid request target {target:?}: {reason}")]
    InvalidUri { target: String, reason: String },

    #[error("request target {0:?} has no host")]
    MissingHost(String),

    #[error("no port given and scheme {scheme:?} has no default")]
    UnknownScheme { scheme: String },
}

/// Resolve a request target to the origin host and port.
pub fn resolve(target: &str) -> Result<TargetAddr, ResolveError> {
    if target.contains("https") {
        parse_absolute(target)
    } else if !target.contains("://") {
        parse_absolute(&format!("https://{}", target))
    } else {
        parse_absolute(target)
    }
}

fn parse_absolute(uri: &str) -> Result<TargetAddr, ResolveError> {
    let url = Url::parse(uri).map_err(|e| ResolveError::InvalidUri {
        target: uri.to_string(),
        reason: e.to_string(),
    })?;

    let host = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => return Err(ResolveError::MissingHost(uri.to_string())),
    };

    // `Url::port` hides a port equal to the scheme's known default (ws:80, ftp:21, ...).
    let port = match (url.port().or_else(|| explicit_port(uri)), url.scheme()) {
        (Some(port), _) => port,
        (None, "http") => 80,
        (None, "https") => 443,
        (None, scheme) => {
            return Err(ResolveError::UnknownScheme {
                scheme: scheme.to_string(),
            })
        }
    };

    Ok(TargetAddr { host, port })
}

/// Port written in the authority of `uri`, if any.
fn explicit_port(uri: &str) -> Option<u16> {
    let (_, rest) = uri.split_once("://")?;
    let authority = rest.split(|c| matches!(c, '/' | '?' | '#')).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let (_, port) = host_port.rsplit_once(':')?;
    port.parse().ok()
}
