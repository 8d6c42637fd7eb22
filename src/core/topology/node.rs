// src/core/topology/node.rs

//! A single simulated Cassandra node: the unbound, declarative shape the
//! operator builds and passes to the bind manager. Peer info, version
//! strings, and token are all surfaced back to clients via the default
//! `system.local`/`system.peers` responses (SPEC_FULL.md §3).

use super::{DcId, NodeId};
use crate::core::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

/// A node as declared by the operator, before it is bound to a listening
/// address. `id` and `token` are filled in once the node is placed inside a
/// `DataCenterBuilder` (or left as standalone defaults for a node registered
/// on its own).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: Option<String>,
    pub cassandra_version: String,
    pub dse_version: Option<String>,
    pub peer_info: BTreeMap<String, Value>,
    pub token: String,
    /// Requested bind address; `None` means "ask the address resolver for one".
    pub requested_address: Option<SocketAddr>,
    /// Filled in by the bind manager once this node is actually bound;
    /// `None` for a node that has never been registered (or after
    /// `unregister`).
    #[serde(skip)]
    pub bound_address: Option<SocketAddr>,
    /// Set once this node has been placed inside a `DataCenterBuilder`, so a
    /// later attempt to register it standalone can be rejected (SPEC_FULL.md
    /// §3: "a node belonging to a cluster must be registered via its cluster").
    pub(crate) parent: Option<DcId>,
    /// Test-only hook: makes the bind manager sleep this long before binding
    /// the node's listener, used to exercise the total bind-timeout budget
    /// deterministically (SPEC_FULL.md §8, scenario S5) without depending on
    /// a custom `AddressResolver`.
    #[serde(skip)]
    pub bind_delay: Option<Duration>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            id: NodeId(0),
            name: None,
            cassandra_version: "3.11.2".to_string(),
            dse_version: None,
            peer_info: BTreeMap::new(),
            token: "0".to_string(),
            requested_address: None,
            bound_address: None,
            parent: None,
            bind_delay: None,
        }
    }
}

/// Builds a `Node`. Mirrors the rest of the topology builders: cheap,
/// `Clone`-able, consumed by `.build()`.
#[derive(Debug, Clone, Default)]
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.node.name = Some(name.into());
        self
    }

    pub fn cassandra_version(mut self, version: impl Into<String>) -> Self {
        self.node.cassandra_version = version.into();
        self
    }

    pub fn dse_version(mut self, version: impl Into<String>) -> Self {
        self.node.dse_version = Some(version.into());
        self
    }

    pub fn peer_info(mut self, key: impl Into<String>, value: Value) -> Self {
        self.node.peer_info.insert(key.into(), value);
        self
    }

    pub fn address(mut self, address: SocketAddr) -> Self {
        self.node.requested_address = Some(address);
        self
    }

    /// Test-only: see `Node::bind_delay`.
    pub fn bind_delay(mut self, delay: Duration) -> Self {
        self.node.bind_delay = Some(delay);
        self
    }

    pub fn build(self) -> Node {
        self.node
    }
}

impl Node {
    /// Validates a node passed directly to `register()` rather than nested
    /// in a `Cluster`/`DataCenter`.
    pub fn validate_standalone(&self) -> CoreResult<()> {
        if self.parent.is_some() {
            return Err(CoreError::BadArgument(
                "node already belongs to a data center; register its cluster instead".into(),
            ));
        }
        Ok(())
    }
}
