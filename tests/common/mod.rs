//! Shared utilities for proxy integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use forward_proxy::net::listener::Listener;
use forward_proxy::{ProxyConfig, ProxyServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Upper bound for any single step of a test.
#[allow(dead_code)]
pub const STEP: Duration = Duration::from_secs(5);

/// Start a proxy on an ephemeral loopback port.
pub async fn start_proxy() -> (SocketAddr, Shutdown) {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, None);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = ProxyServer::new(ProxyConfig::default())
            .run(listener, server_shutdown)
            .await;
    });

    (addr, shutdown)
}

/// Start an origin that runs `handler` for every accepted connection.
pub async fn start_origin<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(handler(socket));
        }
    });

    addr
}

/// Start an origin that echoes everything back until EOF.
#[allow(dead_code)]
pub async fn start_echo_origin() -> SocketAddr {
    start_origin(|mut socket| async move {
        let mut buf = [0u8; 1024];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if socket.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
    .await
}

/// A loopback port with nothing listening on it.
#[allow(dead_code)]
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Read until the peer closes, failing the test if it takes too long.
#[allow(dead_code)]
pub async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    tokio::time::timeout(STEP, stream.read_to_end(&mut out))
        .await
        .expect("peer did not close")
        .unwrap_or_default();
    out
}
