// tests/integration/priming_test.rs

//! Scenarios S1-S3 and S7 from SPEC_FULL.md §5 (spec.md §8): priming a
//! canned response, positional/named parameter matching including the `"*"`
//! wildcard, and the auto-prime a bare `Prepare` leaves behind for later
//! `Execute`s.

use super::test_helpers::{test_server, TestClient};
use simulacra::{
    Action, ClusterBuilder, Consistency, ExpectedParams, ExpectedValue, ExpectedValueKind, Matcher,
    Message, PrimeKind, Prime, QueryMatcher, RegisterOptions, Row, Scope,
};
use std::collections::BTreeMap;

async fn single_node_client(server: &simulacra::SimServer) -> TestClient {
    let cluster = ClusterBuilder::new().simple(1, 1).build();
    let bound = server
        .register(cluster, RegisterOptions::default())
        .await
        .expect("register should succeed");
    let addr = bound
        .data_center(simulacra::DcId(0))
        .unwrap()
        .node(simulacra::NodeId(0))
        .unwrap()
        .bound_address
        .unwrap();
    let mut client = TestClient::connect(addr).await;
    assert!(matches!(client.startup().await, Some(Message::Ready)));
    client
}

fn rows(cols: &[(&str, &str)], values: Vec<Vec<serde_json::Value>>) -> Message {
    Message::Rows {
        columns: cols.iter().map(|(n, t)| (n.to_string(), t.to_string())).collect(),
        rows: values.into_iter().map(Row).collect(),
    }
}

#[tokio::test]
async fn s1_simple_query_prime_matches_exact_text_only() {
    let server = test_server();
    server.prime(Prime::new(
        Scope::whole_deployment(),
        Matcher::Query(QueryMatcher {
            query: "Select * FROM TABLE2".to_string(),
            consistency: None,
            params: None,
        }),
        vec![Action::respond(rows(
            &[("column1", "text"), ("column2", "int")],
            vec![vec![serde_json::json!("column1"), serde_json::json!(2)]],
        ))],
    ));
    let mut client = single_node_client(&server).await;

    let primed = client.query("Select * FROM TABLE2").await.unwrap();
    match primed {
        Message::Rows { rows, .. } => assert_eq!(rows.len(), 1),
        other => panic!("expected primed Rows, got {other:?}"),
    }

    let unprimed = client.query("Select * FROM OTHER").await.unwrap();
    match unprimed {
        Message::Void => {}
        Message::Rows { rows, .. } => assert!(rows.is_empty()),
        other => panic!("expected Void/empty Rows, got {other:?}"),
    }
}

#[tokio::test]
async fn s2_named_parameters_require_every_declared_value_to_match() {
    let server = test_server();
    let mut named = BTreeMap::new();
    named.insert(
        "id".to_string(),
        ExpectedValue {
            type_name: "bigint".to_string(),
            value: ExpectedValueKind::Literal(serde_json::json!(1)),
        },
    );
    named.insert(
        "id2".to_string(),
        ExpectedValue {
            type_name: "bigint".to_string(),
            value: ExpectedValueKind::Literal(serde_json::json!(2)),
        },
    );
    server.prime(Prime::new(
        Scope::whole_deployment(),
        Matcher::Query(QueryMatcher {
            query: "SELECT * FROM users WHERE id = :id and id2 = :id2".to_string(),
            consistency: None,
            params: Some(ExpectedParams::Named(named)),
        }),
        vec![Action::respond(rows(&[("id", "bigint")], vec![vec![serde_json::json!(1)]]))],
    ));
    let mut client = single_node_client(&server).await;

    let exact = execute_named(&mut client, &[("id", 1), ("id2", 2)]).await;
    assert_rows_len(&exact, 1);

    let wrong_value = execute_named(&mut client, &[("id", 2), ("id2", 2)]).await;
    assert_rows_len(&wrong_value, 0);

    let missing = execute_named(&mut client, &[("id", 1)]).await;
    assert_rows_len(&missing, 0);

    let empty = execute_named(&mut client, &[]).await;
    assert_rows_len(&empty, 0);
}

async fn execute_named(client: &mut TestClient, values: &[(&str, i64)]) -> Message {
    use simulacra::core::protocol::message::BoundValue;
    let mut named = BTreeMap::new();
    for (k, v) in values {
        named.insert(
            k.to_string(),
            BoundValue {
                type_name: "bigint".to_string(),
                value: serde_json::json!(v),
            },
        );
    }
    client
        .roundtrip(Message::Query {
            query: "SELECT * FROM users WHERE id = :id and id2 = :id2".to_string(),
            consistency: Consistency::One,
            params: simulacra::QueryParams {
                positional: Vec::new(),
                named,
            },
        })
        .await
        .unwrap()
}

fn assert_rows_len(message: &Message, expected: usize) {
    match message {
        Message::Rows { rows, .. } => assert_eq!(rows.len(), expected, "unexpected rows: {rows:?}"),
        Message::Void => assert_eq!(expected, 0),
        other => panic!("expected Rows/Void, got {other:?}"),
    }
}

#[tokio::test]
async fn s3_positional_parameters_reject_extra_values_and_text_drift() {
    let server = test_server();
    server.prime(Prime::new(
        Scope::whole_deployment(),
        Matcher::Query(QueryMatcher {
            query: "SELECT table FROM foo WHERE c1=?".to_string(),
            consistency: None,
            params: Some(ExpectedParams::Positional(vec![ExpectedValue {
                type_name: "ascii".to_string(),
                value: ExpectedValueKind::Literal(serde_json::json!("c1")),
            }])),
        }),
        vec![Action::respond(rows(&[("table", "text")], vec![vec![serde_json::json!("foo")]]))],
    ));
    let mut client = single_node_client(&server).await;

    let exact = execute_positional(&mut client, "SELECT table FROM foo WHERE c1=?", &["c1"]).await;
    assert_rows_len(&exact, 1);

    let extra = execute_positional(&mut client, "SELECT table FROM foo WHERE c1=?", &["c1", "extra"]).await;
    assert_rows_len(&extra, 0);

    let drifted = execute_positional(&mut client, "SELECT table FROM foo WHERE c1 =?", &["c1"]).await;
    assert_rows_len(&drifted, 0);
}

async fn execute_positional(client: &mut TestClient, query: &str, values: &[&str]) -> Message {
    use simulacra::core::protocol::message::BoundValue;
    let positional = values
        .iter()
        .map(|v| BoundValue {
            type_name: "ascii".to_string(),
            value: serde_json::json!(v),
        })
        .collect();
    client
        .roundtrip(Message::Query {
            query: query.to_string(),
            consistency: Consistency::One,
            params: simulacra::QueryParams {
                positional,
                named: BTreeMap::new(),
            },
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn s7_prepare_then_execute_with_any_value_gets_empty_rows_not_unprepared() {
    let server = test_server();
    let mut client = single_node_client(&server).await;

    let prepared = client
        .roundtrip(Message::Prepare {
            query: "SELECT * FROM t WHERE k=?".to_string(),
        })
        .await
        .unwrap();
    let id = match prepared {
        Message::Prepared { id, .. } => id,
        other => panic!("expected Prepared, got {other:?}"),
    };

    let executed = client
        .roundtrip(Message::Execute {
            id,
            consistency: Consistency::One,
            params: simulacra::QueryParams {
                positional: vec![simulacra::core::protocol::message::BoundValue {
                    type_name: "varchar".to_string(),
                    value: serde_json::json!("anything at all"),
                }],
                named: BTreeMap::new(),
            },
        })
        .await
        .unwrap();
    match executed {
        Message::Rows { rows, .. } => assert!(rows.is_empty()),
        other => panic!("expected empty Rows, not {other:?}"),
    }
}

#[tokio::test]
async fn execute_with_unknown_id_gets_unprepared() {
    let server = test_server();
    let mut client = single_node_client(&server).await;

    let executed = client
        .roundtrip(Message::Execute {
            id: bytes::Bytes::from_static(b"\0\0\0\0\0\0\0\0"),
            consistency: Consistency::One,
            params: simulacra::QueryParams::default(),
        })
        .await
        .unwrap();
    assert!(matches!(
        executed,
        Message::Error(simulacra::ErrorBody::Unprepared { .. })
    ));
}

#[tokio::test]
async fn clear_then_prime_again_leaves_exactly_one_copy() {
    let server = test_server();
    let scope = Scope::whole_deployment();
    let build_prime = || {
        Prime::new(
            scope.clone(),
            Matcher::Query(QueryMatcher {
                query: "SELECT 1".to_string(),
                consistency: None,
                params: None,
            }),
            vec![Action::respond(Message::Void)],
        )
    };

    server.prime(build_prime());
    let cleared = server.clear(&scope, PrimeKind::User);
    assert_eq!(cleared, 1);
    server.prime(build_prime());

    // Only one matching prime should be registered for this scope/kind.
    let cleared_again = server.clear(&scope, PrimeKind::User);
    assert_eq!(cleared_again, 1);
}
