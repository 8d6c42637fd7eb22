// src/core/topology/activity_log.rs

//! Per-cluster append-only record of frames seen by any of its bound nodes,
//! toggled by the operator (SPEC_FULL.md §3, `accept`/ActivityLog). Mirrors
//! the shape of the teacher's latency/stats accumulators: a `Mutex`-guarded
//! `Vec` behind an `Arc` so every connection engine can append without
//! routing through a central actor.

use super::{DcId, NodeId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ActivityLogEntry {
    pub dc_id: DcId,
    pub node_id: NodeId,
    pub remote_addr: SocketAddr,
    pub frame_kind: String,
    pub matched_prime_id: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ActivityLog {
    enabled: AtomicBool,
    entries: Mutex<Vec<ActivityLogEntry>>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl ActivityLog {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.entries.lock().clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn record(&self, entry: ActivityLogEntry) {
        if self.is_enabled() {
            self.entries.lock().push(entry);
        }
    }

    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
