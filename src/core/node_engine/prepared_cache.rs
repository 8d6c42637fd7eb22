// src/core/node_engine/prepared_cache.rs

//! Tracks which query texts a node has handed out prepared-statement ids
//! for, so `Execute` can resolve an id back to its query without the client
//! resending it. Ids are a content hash of the query text (not random), so a
//! prime registered after the `Prepare` that produced an id still matches
//! the `Execute`s that follow it.

use bytes::Bytes;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Deterministic 8-byte prepared-statement id for `query`, CQL-protocol
/// style (a short content digest rather than the full SHA-256 output).
pub fn compute_id(query: &str) -> Bytes {
    let digest = Sha256::digest(query.trim().as_bytes());
    Bytes::copy_from_slice(&digest[..8])
}

#[derive(Default)]
pub struct PreparedCache {
    queries: DashMap<Bytes, String>,
}

impl PreparedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `query` has been prepared, returning its id.
    pub fn register(&self, query: &str) -> Bytes {
        let id = compute_id(query);
        self.queries.insert(id.clone(), query.to_string());
        id
    }

    pub fn resolve(&self, id: &Bytes) -> Option<String> {
        self.queries.get(id).map(|entry| entry.value().clone())
    }
}
