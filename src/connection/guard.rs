// src/connection/guard.rs

//! RAII cleanup for a connection task: whatever path `handle_connection`
//! returns by (clean EOF, malformed frame, control-channel shutdown, or a
//! panic unwinding through it), the node engine's accepted-channel set must
//! stop tracking this address.

use crate::core::node_engine::NodeEngine;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct ConnectionGuard {
    engine: Arc<NodeEngine>,
    addr: SocketAddr,
}

impl ConnectionGuard {
    pub fn new(engine: Arc<NodeEngine>, addr: SocketAddr) -> Self {
        Self { engine, addr }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.engine.unregister_connection(&self.addr);
    }
}
