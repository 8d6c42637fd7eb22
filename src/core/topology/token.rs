// src/core/topology/token.rs

//! Deterministic token assignment: every node gets a token computed from its
//! position in the topology rather than a random or operator-supplied one, so
//! that two builds of the same shape produce the same ring.

use super::{DcId, NodeId};

/// Token for node `node_id` (0-indexed, in creation order within its data
/// center) out of `nodes_in_dc` total nodes in data center `dc_id`.
///
/// `(node_id * floor(2^64 / nodes_in_dc)) + dc_id * 100`, matching the
/// partitioner-agnostic ring layout real test fixtures expect: evenly spaced
/// within a DC, offset between DCs so tokens never collide.
pub fn compute_token(dc_id: DcId, node_id: NodeId, nodes_in_dc: u32) -> String {
    if nodes_in_dc == 0 {
        return "0".to_string();
    }
    let span = (1u128 << 64) / nodes_in_dc as u128;
    let token = (node_id.0 as u128 * span) + (dc_id.0 as u128 * 100);
    token.to_string()
}

/// Standalone nodes registered without a data center always get token `"0"`.
pub fn standalone_token() -> String {
    "0".to_string()
}
