// src/core/scope.rs

//! The selector used both for prime visibility and for operator commands
//! (`reject`, `accept`, `close_connections`, `clear`, ...). Unset levels
//! widen: a `Scope` with every field `None` reaches the whole deployment.

use crate::core::topology::{ClusterId, DcId, NodeAddress, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub cluster_id: Option<ClusterId>,
    pub dc_id: Option<DcId>,
    pub node_id: Option<NodeId>,
}

impl Scope {
    pub fn whole_deployment() -> Self {
        Self::default()
    }

    pub fn cluster(cluster_id: ClusterId) -> Self {
        Self {
            cluster_id: Some(cluster_id),
            dc_id: None,
            node_id: None,
        }
    }

    pub fn data_center(cluster_id: ClusterId, dc_id: DcId) -> Self {
        Self {
            cluster_id: Some(cluster_id),
            dc_id: Some(dc_id),
            node_id: None,
        }
    }

    pub fn node(cluster_id: ClusterId, dc_id: DcId, node_id: NodeId) -> Self {
        Self {
            cluster_id: Some(cluster_id),
            dc_id: Some(dc_id),
            node_id: Some(node_id),
        }
    }

    /// Whether this scope reaches the given node: every level this scope
    /// pins down must agree, and an unset level (including all the levels
    /// below a mismatch) always widens to match.
    pub fn contains(&self, addr: &NodeAddress) -> bool {
        match &self.cluster_id {
            None => return true,
            Some(c) if *c != addr.cluster_id => return false,
            Some(_) => {}
        }
        match &self.dc_id {
            None => return true,
            Some(d) if *d != addr.dc_id => return false,
            Some(_) => {}
        }
        match &self.node_id {
            None => return true,
            Some(n) if *n != addr.node_id => return false,
            Some(_) => {}
        }
        true
    }
}

/// Scope of a `Disconnect` action, distinct from the operator-facing `Scope`
/// above: `Connection` has no corresponding cluster/dc/node id, since it
/// means "just the connection that triggered this action".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionScope {
    Connection,
    Node,
    DataCenter,
    Cluster,
}

/// How a `Disconnect` action closes the targeted channel(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectHow {
    Disconnect,
    ShutdownRead,
    ShutdownWrite,
}
