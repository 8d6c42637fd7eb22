// src/server/listener.rs

//! The per-node accept loop: owns the `TcpListener` for one bound node and
//! reacts to `ListenerControl` messages sent by the node's reject-state
//! machine or by `SimServer::unregister` (SPEC_FULL.md §4.4/§4.5). Spawned
//! once per successfully bound node by `SimServer::register`.

use crate::core::node_engine::{ListenerControl, NodeEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Runs until it receives `ListenerControl::Shutdown` (or the engine's sender
/// is dropped). `listener` starts `Some` — the node is always bound at the
/// moment `register()` hands it off here.
pub async fn run(
    listener: TcpListener,
    bound_address: SocketAddr,
    engine: Arc<NodeEngine>,
    mut lifecycle_rx: mpsc::Receiver<ListenerControl>,
) {
    let mut current = Some(listener);
    loop {
        match current.take() {
            Some(listener) => match run_bound(&listener, &engine, &mut lifecycle_rx).await {
                BoundOutcome::Unbind => {
                    info!(node = %engine.node_address(), "listener unbound");
                }
                BoundOutcome::Shutdown => {
                    info!(node = %engine.node_address(), "listener shut down");
                    return;
                }
                BoundOutcome::KeepBound => {
                    current = Some(listener);
                }
            },
            None => match lifecycle_rx.recv().await {
                Some(ListenerControl::Rebind) => match TcpListener::bind(bound_address).await {
                    Ok(listener) => {
                        info!(node = %engine.node_address(), %bound_address, "listener rebound");
                        current = Some(listener);
                    }
                    Err(e) => {
                        error!(node = %engine.node_address(), %bound_address, error = %e, "failed to rebind listener");
                    }
                },
                Some(ListenerControl::Unbind) => {}
                Some(ListenerControl::Shutdown) | None => {
                    debug!(node = %engine.node_address(), "listener task exiting while unbound");
                    return;
                }
            },
        }
    }
}

enum BoundOutcome {
    Unbind,
    Shutdown,
    KeepBound,
}

async fn run_bound(
    listener: &TcpListener,
    engine: &Arc<NodeEngine>,
    lifecycle_rx: &mut mpsc::Receiver<ListenerControl>,
) -> BoundOutcome {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let engine = engine.clone();
                        tokio::spawn(async move {
                            crate::connection::handle_connection(stream, addr, engine).await;
                        });
                    }
                    Err(e) => {
                        warn!(node = %engine.node_address(), error = %e, "accept failed");
                    }
                }
            }
            ctrl = lifecycle_rx.recv() => {
                return match ctrl {
                    Some(ListenerControl::Unbind) => BoundOutcome::Unbind,
                    Some(ListenerControl::Shutdown) | None => BoundOutcome::Shutdown,
                    Some(ListenerControl::Rebind) => BoundOutcome::KeepBound,
                };
            }
        }
    }
}
