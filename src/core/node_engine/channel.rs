// src/core/node_engine/channel.rs

//! Control-plane messages used to reach into a connection or listener task
//! that a different task (an action executing on behalf of some other
//! connection's matched prime, or the bind manager) doesn't own. Each
//! connection/listener task is the sole owner of its socket; everything
//! else addresses it by sending a message rather than sharing the socket,
//! the same split the teacher uses for its global shutdown broadcast,
//! generalized to per-connection and per-listener control.

use crate::core::scope::DisconnectHow;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sent to a connection task to make it close its own socket.
#[derive(Debug, Clone, Copy)]
pub enum ControlMsg {
    Shutdown(DisconnectHow),
}

/// A handle the node engine keeps for every accepted connection, letting
/// action execution reach a socket it doesn't own.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub remote_addr: SocketAddr,
    control_tx: mpsc::Sender<ControlMsg>,
    /// The keyspace this connection last selected via `USE <keyspace>`, if
    /// any — tracked here rather than in the connection task itself so the
    /// `connections(scope)` operator surface can report it.
    keyspace: Arc<Mutex<Option<String>>>,
}

impl ConnectionHandle {
    pub fn new(remote_addr: SocketAddr, control_tx: mpsc::Sender<ControlMsg>) -> Self {
        Self {
            remote_addr,
            control_tx,
            keyspace: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn shutdown(&self, how: DisconnectHow) {
        let _ = self.control_tx.send(ControlMsg::Shutdown(how)).await;
    }

    pub fn set_keyspace(&self, keyspace: String) {
        *self.keyspace.lock() = Some(keyspace);
    }

    pub fn keyspace(&self) -> Option<String> {
        self.keyspace.lock().clone()
    }
}

/// Sent to a node's accept-loop task to unbind or rebind its listener, or to
/// tear the task down entirely (`unregister`).
#[derive(Debug, Clone, Copy)]
pub enum ListenerControl {
    /// Close the listening socket; the accept loop stays alive so a later
    /// `Rebind` can reopen it on the same address (reject-state transitions).
    Unbind,
    /// Reopen the listener on the address it was last bound to.
    Rebind,
    /// Close the listening socket and exit the accept loop for good
    /// (`unregister`/`close()` — this node will never be reused).
    Shutdown,
}
