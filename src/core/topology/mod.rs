// src/core/topology/mod.rs

//! The declarative Cluster→DataCenter→Node tree described in SPEC_FULL.md §3,
//! independent of whether any of it is currently bound. Parent back-references
//! are modeled as ids rather than strong pointers (see DESIGN.md, "Parent
//! back-references"), so the tree is plain, `Clone`-able, `Serialize`-able data
//! — builders assign ids and the bind manager later computes tokens and
//! addresses from it.

pub mod activity_log;
pub mod cluster;
pub mod datacenter;
pub mod node;
pub mod token;

pub use activity_log::{ActivityLog, ActivityLogEntry};
pub use cluster::{Cluster, ClusterBuilder};
pub use datacenter::{DataCenter, DataCenterBuilder};
pub use node::{Node, NodeBuilder};
pub use token::compute_token;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cluster identifier. Server-assigned (a UUID) if the operator doesn't
/// supply one at build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub String);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ClusterId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// A data-center identifier: its insertion-order index within its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DcId(pub u32);

/// A node identifier: its insertion-order index within its data center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Identifies one node within the whole topology tree: the triple a bound
/// node, a prime's scope, and an activity-log entry all key off of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    pub cluster_id: ClusterId,
    pub dc_id: DcId,
    pub node_id: NodeId,
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cluster_id, self.dc_id.0, self.node_id.0)
    }
}
