// tests/integration/reject_state_test.rs

//! Invariant 6 (spec.md §8): `reject(after=N, STOP)` lets exactly the next N
//! `Startup`s through, and the `(N+1)`-th arrives at a closed listener. Also
//! covers `REJECT_STARTUP` (silently dropped, connection stays open) and
//! `accept()` rebinding an unbound listener.

use super::test_helpers::{test_server, TestClient};
use simulacra::{ClusterBuilder, Message, RegisterOptions, RejectScope, Scope};
use std::net::SocketAddr;
use std::time::Duration;

async fn register_single_node(server: &simulacra::SimServer) -> SocketAddr {
    let cluster = ClusterBuilder::new().simple(1, 1).build();
    let bound = server
        .register(cluster, RegisterOptions::default())
        .await
        .expect("register should succeed");
    bound
        .data_center(simulacra::DcId(0))
        .unwrap()
        .node(simulacra::NodeId(0))
        .unwrap()
        .bound_address
        .unwrap()
}

#[tokio::test]
async fn s6_reject_after_n_stop_lets_exactly_n_startups_through() {
    let server = test_server();
    let addr = register_single_node(&server).await;

    server.reject(&Scope::whole_deployment(), 2, RejectScope::Stop).await;

    for i in 0..2 {
        let mut client = TestClient::connect(addr).await;
        let reply = client.startup().await;
        assert!(
            matches!(reply, Some(Message::Ready)),
            "startup #{i} should still succeed, got {reply:?}"
        );
    }

    // The (N+1)-th attempt must arrive at a closed listener. The unbind is
    // driven by a control message the listener task processes
    // asynchronously, so poll briefly instead of asserting on the very next
    // instruction.
    let mut still_open = true;
    for _ in 0..20 {
        if TcpConnectAttempt::try_connect(addr).await.is_err() {
            still_open = false;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(!still_open, "listener should be unbound after N Startups");
}

struct TcpConnectAttempt;
impl TcpConnectAttempt {
    async fn try_connect(addr: SocketAddr) -> std::io::Result<()> {
        tokio::time::timeout(Duration::from_millis(500), tokio::net::TcpStream::connect(addr))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"))?
            .map(|_| ())
    }
}

#[tokio::test]
async fn reject_startup_drops_the_frame_but_keeps_the_connection_open() {
    let server = test_server();
    let addr = register_single_node(&server).await;

    server
        .reject(&Scope::whole_deployment(), 0, RejectScope::RejectStartup)
        .await;

    let mut client = TestClient::connect(addr).await;
    client.send_startup_without_waiting().await;
    let reply = client.try_recv(Duration::from_millis(500)).await;
    assert!(reply.is_none(), "Startup should be silently dropped, got {reply:?}");
}

#[tokio::test]
async fn accept_rebinds_an_unbound_listener() {
    let server = test_server();
    let addr = register_single_node(&server).await;

    server.reject(&Scope::whole_deployment(), 0, RejectScope::Unbind).await;
    assert!(
        TcpConnectAttempt::try_connect(addr).await.is_err(),
        "listener should be unbound"
    );

    server.accept(&Scope::whole_deployment()).await;
    // Rebinding happens asynchronously (a control message to the listener
    // task); give it a moment before asserting the listener is back.
    let mut last_err = None;
    for _ in 0..20 {
        match TcpConnectAttempt::try_connect(addr).await {
            Ok(()) => {
                last_err = None;
                break;
            }
            Err(e) => {
                last_err = Some(e);
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
    assert!(last_err.is_none(), "listener should have been rebound on the same address");
}

#[tokio::test]
async fn stop_disconnects_existing_channels_unlike_plain_unbind() {
    let server = test_server();
    let addr = register_single_node(&server).await;
    let mut client = TestClient::connect(addr).await;
    assert!(matches!(client.startup().await, Some(Message::Ready)));

    server.stop(&Scope::whole_deployment()).await;

    let reply = client.try_recv(Duration::from_millis(500)).await;
    assert!(reply.is_none(), "STOP should close existing channels, got {reply:?}");
}
