//! End-to-end behaviour of the proxy over real sockets.

use std::time::Duration;

use forward_proxy::proxy::session::CONNECT_ESTABLISHED;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

mod common;
use common::STEP;

#[tokio::test]
async fn connect_replies_exactly_then_relays() {
    let origin = common::start_echo_origin().await;
    let (proxy, shutdown) = common::start_proxy().await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    let request = format!("CONNECT {} HTTP/1.1\r\n\r\n", origin);
    client.write_all(request.as_bytes()).await.unwrap();

    let mut reply = vec![0u8; CONNECT_ESTABLISHED.len()];
    timeout(STEP, client.read_exact(&mut reply)).await.unwrap().unwrap();
    assert_eq!(reply, b"HTTP/1.1 200 OK\r\n\r\n");

    for message in [&b"first"[..], &b"\x16\x03\x01binary"[..]] {
        client.write_all(message).await.unwrap();
        let mut echoed = vec![0u8; message.len()];
        timeout(STEP, client.read_exact(&mut echoed)).await.unwrap().unwrap();
        assert_eq!(echoed, message);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn connect_forwards_bytes_sent_with_the_head() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let origin = common::start_origin(move |mut socket| {
        let tx = tx.clone();
        async move {
            let mut buf = vec![0u8; 8];
            if socket.read_exact(&mut buf).await.is_ok() {
                let _ = tx.send(buf);
            }
        }
    })
    .await;
    let (proxy, shutdown) = common::start_proxy().await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    let request = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n\r\nTRAILING", origin, origin);
    client.write_all(request.as_bytes()).await.unwrap();

    let first_bytes = timeout(STEP, rx.recv()).await.unwrap().unwrap();
    assert_eq!(first_bytes, b"TRAILING");

    let mut reply = vec![0u8; CONNECT_ESTABLISHED.len()];
    timeout(STEP, client.read_exact(&mut reply)).await.unwrap().unwrap();
    assert_eq!(reply, CONNECT_ESTABLISHED);

    shutdown.trigger();
}

#[tokio::test]
async fn get_is_forwarded_and_answered_unmodified() {
    const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nVia: origin\r\n\r\nok";

    let (tx, mut rx) = mpsc::unbounded_channel();
    let origin = common::start_origin(move |mut socket| {
        let tx = tx.clone();
        async move {
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.ends_with(b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => received.extend_from_slice(&buf[..n]),
                }
            }
            let _ = tx.send(received);
            let _ = socket.write_all(RESPONSE).await;
        }
    })
    .await;
    let (proxy, shutdown) = common::start_proxy().await;

    let request = format!(
        "GET http://{}/index.html HTTP/1.1\r\nHost: {}\r\nProxy-Connection: keep-alive\r\n\r\n",
        origin, origin
    );
    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(request.as_bytes()).await.unwrap();

    let forwarded = timeout(STEP, rx.recv()).await.unwrap().unwrap();
    assert_eq!(forwarded, request.as_bytes());

    // The origin task closes after answering, which ends the session.
    assert_eq!(common::read_to_close(&mut client).await, RESPONSE);

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_origin_closes_client_without_bytes() {
    let port = common::closed_port().await;
    let (proxy, shutdown) = common::start_proxy().await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    let request = format!("CONNECT 127.0.0.1:{} HTTP/1.1\r\n\r\n", port);
    client.write_all(request.as_bytes()).await.unwrap();

    assert!(common::read_to_close(&mut client).await.is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn malformed_request_closes_without_response() {
    let (proxy, shutdown) = common::start_proxy().await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(b"\x00garbage\r\n\r\n").await.unwrap();

    assert!(common::read_to_close(&mut client).await.is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn idle_tunnel_does_not_block_other_sessions() {
    let origin = common::start_echo_origin().await;
    let (proxy, shutdown) = common::start_proxy().await;

    let mut idle = TcpStream::connect(proxy).await.unwrap();
    idle.write_all(format!("CONNECT {} HTTP/1.1\r\n\r\n", origin).as_bytes())
        .await
        .unwrap();
    let mut reply = vec![0u8; CONNECT_ESTABLISHED.len()];
    timeout(STEP, idle.read_exact(&mut reply)).await.unwrap().unwrap();

    // A client that never finishes its head.
    let mut stalled = TcpStream::connect(proxy).await.unwrap();
    stalled.write_all(b"GET http://").await.unwrap();

    let mut active = TcpStream::connect(proxy).await.unwrap();
    active
        .write_all(format!("CONNECT {} HTTP/1.1\r\n\r\nping", origin).as_bytes())
        .await
        .unwrap();
    let mut buf = vec![0u8; CONNECT_ESTABLISHED.len() + 4];
    timeout(STEP, active.read_exact(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf[CONNECT_ESTABLISHED.len()..], b"ping");

    shutdown.trigger();
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let (proxy, shutdown) = common::start_proxy().await;
    assert!(TcpStream::connect(proxy).await.is_ok());

    shutdown.trigger();

    let refused = timeout(STEP, async {
        loop {
            if TcpStream::connect(proxy).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(refused.is_ok(), "listener still accepting after shutdown");
}
