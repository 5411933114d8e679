//! Outbound connections to origin servers.

use std::time::Duration;
use tokio::net::TcpStream;

use crate::http::target::TargetAddr;

/// Open a TCP connection to the origin.
///
/// Name resolution happens inside `TcpStream::connect`. A zero `timeout`
/// leaves the attempt bounded only by the OS.
pub async fn connect(target: &TargetAddr, timeout: Duration) -> std::io::Result<TcpStream> {
    let attempt = TcpStream::connect((target.host.as_str(), target.port));

    let stream = if timeout.is_zero() {
        attempt.await?
    } else {
        tokio::time::timeout(timeout, attempt).await.map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect to {} timed out after {:?}", target, timeout),
            )
        })??
    };

    tracing::debug!(
        origin = %target,
        local_addr = ?stream.local_addr().ok(),
        "Origin connected"
    );

    Ok(stream)
}
