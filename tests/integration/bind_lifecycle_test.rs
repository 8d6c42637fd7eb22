// tests/integration/bind_lifecycle_test.rs

//! Exercises the bind/lifecycle manager (component E): successful register,
//! all-or-nothing rollback on a bind collision (S4), the total bind-timeout
//! budget (S5), and unregister closing every open channel (S6).

use super::test_helpers::{test_config, test_server, TestClient};
use simulacra::{ClusterBuilder, CoreError, DataCenterBuilder, NodeBuilder, RegisterOptions};
use std::time::Duration;

#[tokio::test]
async fn register_binds_every_node_and_publishes_the_cluster() {
    let server = test_server();
    let cluster = ClusterBuilder::new().simple(2, 2).build();

    let bound = server
        .register(cluster, RegisterOptions::default())
        .await
        .expect("register should succeed");

    assert_eq!(bound.node_count(), 4);
    for (dc_id, node_id) in bound.node_addresses() {
        let node = bound.data_center(dc_id).unwrap().node(node_id).unwrap();
        assert!(node.bound_address.is_some(), "every node should be bound");
    }
    assert!(server.cluster(&bound.id).is_some());
}

#[tokio::test]
async fn register_unregister_register_round_trips() {
    let server = test_server();
    let cluster = ClusterBuilder::new().simple(1, 1).build();

    let bound = server
        .register(cluster.clone(), RegisterOptions::default())
        .await
        .expect("first register should succeed");
    server
        .unregister(&bound.id)
        .await
        .expect("unregister should succeed");
    assert!(server.cluster(&bound.id).is_none());

    let mut again = cluster;
    again.id = bound.id.clone();
    server
        .register(again, RegisterOptions::default())
        .await
        .expect("second register of the same shape should also succeed");
}

#[tokio::test]
async fn s4_bind_collision_rolls_back_and_never_publishes() {
    let server = test_server();
    let addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
    // Bind one throwaway listener first so both nodes below collide on a
    // concrete, already-taken port rather than relying on both racing for
    // the ephemeral port 0 resolves separately for each bind.
    let taken = std::net::TcpListener::bind(addr).unwrap();
    let taken_addr = taken.local_addr().unwrap();

    let cluster = ClusterBuilder::new()
        .data_center(
            DataCenterBuilder::new()
                .with_node(|n| n.address(taken_addr))
                .with_node(|n| n.address(taken_addr)),
        )
        .build();
    let cluster_id = cluster.id.clone();

    let err = server
        .register(cluster, RegisterOptions::default())
        .await
        .expect_err("two nodes sharing one address must fail to register");
    assert!(matches!(err, CoreError::BindFailed { .. }), "got {err:?}");

    assert!(server.cluster(&cluster_id).is_none(), "failed register must never publish");
    drop(taken);
}

#[tokio::test]
async fn s5_bind_timeout_elapses_without_registering_and_releases_the_fast_node() {
    let config = test_config();
    let base_port = config.base_port;
    let server = simulacra::SimServer::new(config);

    let cluster = ClusterBuilder::new()
        .data_center(
            DataCenterBuilder::new()
                .node()
                .with_node(|n| n.bind_delay(Duration::from_secs(1))),
        )
        .build();

    let opts = RegisterOptions {
        bind_timeout: Some(Duration::from_millis(500)),
    };
    let started = std::time::Instant::now();
    let err = server
        .register(cluster, opts)
        .await
        .expect_err("a 1s bind delay against a 500ms budget must time out");
    assert!(started.elapsed() < Duration::from_millis(900));
    assert!(matches!(err, CoreError::BindTimeout { .. }), "got {err:?}");

    // The fast node's address must be free again: a fresh bind on the same
    // base port range should succeed immediately.
    let relisten = std::net::TcpListener::bind(("127.0.0.1", base_port));
    assert!(relisten.is_ok(), "fast node's address should have been released");
}

#[tokio::test]
async fn s6_unregister_closes_every_open_channel() {
    let server = test_server();
    let cluster = ClusterBuilder::new().simple(2, 2).build();
    let bound = server
        .register(cluster, RegisterOptions::default())
        .await
        .expect("register should succeed");

    let mut clients = Vec::new();
    for (dc_id, node_id) in bound.node_addresses() {
        let addr = bound
            .data_center(dc_id)
            .unwrap()
            .node(node_id)
            .unwrap()
            .bound_address
            .unwrap();
        let mut client = TestClient::connect(addr).await;
        assert!(client.startup().await.is_some());
        clients.push(client);
    }
    assert_eq!(clients.len(), 4);

    server.unregister(&bound.id).await.expect("unregister should succeed");
    assert!(server.cluster(&bound.id).is_none());

    for mut client in clients {
        let reply = client.try_recv(Duration::from_millis(500)).await;
        assert!(
            reply.is_none(),
            "connection should be closed (no further frames), got {reply:?}"
        );
    }
}

#[tokio::test]
async fn unregister_unknown_cluster_is_a_bad_argument() {
    let server = test_server();
    let err = server
        .unregister(&simulacra::ClusterId("does-not-exist".into()))
        .await
        .expect_err("unregistering an unknown id must fail");
    assert!(matches!(err, CoreError::BadArgument(_)));
}

#[tokio::test]
async fn standalone_node_with_a_dc_parent_cannot_self_register() {
    let server = test_server();
    let cluster = ClusterBuilder::new().simple(1, 1).build();
    let node = cluster
        .data_center(simulacra::DcId(0))
        .unwrap()
        .node(simulacra::NodeId(0))
        .unwrap()
        .clone();

    let err = server
        .register_node(node, RegisterOptions::default())
        .await
        .expect_err("a node that already has a DC parent can't register standalone");
    assert!(matches!(err, CoreError::BadArgument(_)));
}

#[tokio::test]
async fn standalone_register_wraps_the_node_in_a_hidden_cluster() {
    let server = test_server();
    let node = NodeBuilder::new().build();
    let bound = server
        .register_node(node, RegisterOptions::default())
        .await
        .expect("a parentless node should register standalone");
    assert_eq!(bound.node_count(), 1);
}
