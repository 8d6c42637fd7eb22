// src/core/topology/datacenter.rs

//! A data center: a named group of nodes within a cluster. Tokens are
//! assigned across the whole group once its node count is final, at
//! `DataCenterBuilder::build()` time.

use super::node::{Node, NodeBuilder};
use super::token::compute_token;
use super::{DcId, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCenter {
    pub id: DcId,
    pub name: Option<String>,
    pub nodes: Vec<Node>,
}

impl DataCenter {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataCenterBuilder {
    name: Option<String>,
    nodes: Vec<NodeBuilder>,
}

impl DataCenterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a single node, built with the default shape.
    pub fn node(mut self) -> Self {
        self.nodes.push(NodeBuilder::new());
        self
    }

    /// Adds `count` nodes, each built with the default shape.
    pub fn node_count(mut self, count: u32) -> Self {
        for _ in 0..count {
            self.nodes.push(NodeBuilder::new());
        }
        self
    }

    /// Adds one node customized via a builder closure.
    pub fn with_node(mut self, build: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        self.nodes.push(build(NodeBuilder::new()));
        self
    }

    pub(crate) fn build(self, dc_id: DcId) -> DataCenter {
        let total = self.nodes.len() as u32;
        let nodes = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(i, builder)| {
                let node_id = NodeId(i as u32);
                let mut node = builder.build();
                node.id = node_id;
                node.token = compute_token(dc_id, node_id, total);
                node.parent = Some(dc_id);
                node
            })
            .collect();
        DataCenter {
            id: dc_id,
            name: self.name,
            nodes,
        }
    }
}
