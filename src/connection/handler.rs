// src/connection/handler.rs

//! The per-connection task: owns one accepted `TcpStream` end to end. Frames
//! are handled strictly one at a time, which trivially satisfies the
//! per-connection response-ordering guarantee (SPEC_FULL.md §5) without
//! needing to pipeline; the only other thing this task waits on is its own
//! `ControlMsg` channel, so a `Disconnect` action targeting this connection
//! (or its node/DC/cluster) can reach it even though the action runs from
//! inside `NodeEngine::handle_frame`'s caller.

use crate::core::node_engine::{ControlMsg, NodeEngine};
use crate::core::protocol::envelope::Envelope;
use crate::core::protocol::CqlFrameCodec;
use crate::core::scope::DisconnectHow;
use crate::core::stub::Action;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use super::guard::ConnectionGuard;
use crate::core::node_engine::ConnectionHandle;

pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, engine: Arc<NodeEngine>) {
    let (control_tx, mut control_rx) = mpsc::channel(8);
    let handle = ConnectionHandle::new(addr, control_tx);
    engine.register_connection(handle.clone());
    let _guard = ConnectionGuard::new(engine.clone(), addr);

    let mut framed = Framed::new(stream, CqlFrameCodec);

    loop {
        tokio::select! {
            biased;

            ctrl = control_rx.recv() => {
                let how = match ctrl {
                    Some(ControlMsg::Shutdown(how)) => how,
                    None => DisconnectHow::Disconnect,
                };
                apply_shutdown(framed, how).await;
                return;
            }

            frame = framed.next() => {
                match frame {
                    Some(Ok(envelope)) => {
                        if !run_frame(&mut framed, &engine, addr, &handle, envelope).await {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%addr, error = %e, "closing connection after malformed frame");
                        return;
                    }
                    None => {
                        debug!(%addr, "client closed connection");
                        return;
                    }
                }
            }
        }
    }
}

/// Runs one frame's action list to completion. Returns `false` if the
/// connection should stop reading further frames (the socket is already
/// gone or about to be, so there is nothing left to pipeline).
async fn run_frame(
    framed: &mut Framed<TcpStream, CqlFrameCodec>,
    engine: &Arc<NodeEngine>,
    addr: SocketAddr,
    handle: &ConnectionHandle,
    envelope: Envelope,
) -> bool {
    let Envelope { version, stream, message } = envelope;
    let actions = engine.handle_frame(addr, message).await;

    for action in actions {
        match action {
            Action::Respond { message } => {
                if let crate::core::protocol::Message::SetKeyspace(ref keyspace) = message {
                    handle.set_keyspace(keyspace.clone());
                }
                let reply = Envelope { version, stream, message };
                if framed.send(reply).await.is_err() {
                    // The write failed because the peer is already gone;
                    // subsequent writes on this connection fail silently
                    // per SPEC_FULL.md §5.
                    return false;
                }
            }
            Action::NoResponse => {}
            Action::Disconnect { scope, how } => {
                engine.execute_disconnect(scope, how, addr).await;
            }
            Action::Delay { delay_in_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_in_ms)).await;
            }
        }
    }
    true
}

async fn apply_shutdown(framed: Framed<TcpStream, CqlFrameCodec>, how: DisconnectHow) {
    let stream = framed.into_inner();
    match how {
        DisconnectHow::Disconnect => drop(stream),
        DisconnectHow::ShutdownWrite => {
            let mut stream = stream;
            let _ = stream.shutdown().await;
        }
        DisconnectHow::ShutdownRead => match stream.into_std() {
            Ok(std_stream) => {
                let _ = std_stream.shutdown(std::net::Shutdown::Read);
            }
            Err(e) => warn!(error = %e, "failed to apply shutdown_read"),
        },
    }
}
