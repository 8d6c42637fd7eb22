// src/core/topology/cluster.rs

//! The top of the topology tree: a named cluster made of one or more data
//! centers. `ClusterBuilder` is the operator-facing entry point for
//! `register()`.

use super::activity_log::ActivityLog;
use super::datacenter::{DataCenter, DataCenterBuilder};
use super::{ClusterId, DcId, NodeId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: Option<String>,
    pub cassandra_version: String,
    pub dse_version: Option<String>,
    pub data_centers: Vec<DataCenter>,
    #[serde(skip, default = "ActivityLog::shared")]
    pub activity_log: Arc<ActivityLog>,
}

impl Cluster {
    pub fn data_center(&self, id: DcId) -> Option<&DataCenter> {
        self.data_centers.iter().find(|dc| dc.id == id)
    }

    pub fn node_count(&self) -> usize {
        self.data_centers.iter().map(|dc| dc.nodes.len()).sum()
    }

    /// All `(dc_id, node_id)` pairs in the tree, in bind order: data centers
    /// first, nodes within each data center second.
    pub fn node_addresses(&self) -> Vec<(DcId, NodeId)> {
        self.data_centers
            .iter()
            .flat_map(|dc| dc.nodes.iter().map(move |n| (dc.id, n.id)))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterBuilder {
    id: Option<ClusterId>,
    name: Option<String>,
    cassandra_version: Option<String>,
    dse_version: Option<String>,
    data_centers: Vec<DataCenterBuilder>,
}

impl ClusterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(ClusterId(id.into()));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn cassandra_version(mut self, version: impl Into<String>) -> Self {
        self.cassandra_version = Some(version.into());
        self
    }

    pub fn dse_version(mut self, version: impl Into<String>) -> Self {
        self.dse_version = Some(version.into());
        self
    }

    pub fn data_center(mut self, dc: DataCenterBuilder) -> Self {
        self.data_centers.push(dc);
        self
    }

    /// Convenience for the common "N data centers of M nodes each" shape.
    pub fn simple(mut self, data_centers: u32, nodes_per_dc: u32) -> Self {
        for _ in 0..data_centers {
            self.data_centers.push(DataCenterBuilder::new().node_count(nodes_per_dc));
        }
        self
    }

    pub fn build(self) -> Cluster {
        let data_centers = self
            .data_centers
            .into_iter()
            .enumerate()
            .map(|(i, builder)| builder.build(DcId(i as u32)))
            .collect();
        Cluster {
            id: self.id.unwrap_or_else(ClusterId::generate),
            name: self.name,
            cassandra_version: self.cassandra_version.unwrap_or_else(|| "3.11.2".to_string()),
            dse_version: self.dse_version,
            data_centers,
            activity_log: ActivityLog::shared(),
        }
    }
}
