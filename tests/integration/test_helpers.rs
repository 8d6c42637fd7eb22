// tests/integration/test_helpers.rs

//! Shared test scaffolding: a `TestClient` that speaks the public
//! `CqlFrameCodec`/`Message` surface over a raw `TcpStream`, plus a base-port
//! allocator so concurrently-running tests never collide on the loopback
//! range the default `LoopbackAddressResolver` hands out.

use futures::{SinkExt, StreamExt};
use simulacra::{Config, CqlFrameCodec, Envelope, Message, SimServer};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

static NEXT_BASE_PORT: AtomicU16 = AtomicU16::new(31000);

/// Reserves a block of 64 ports for one test, wide enough for any topology
/// this suite builds, and returns a `Config` whose resolver starts there.
pub fn test_config() -> Config {
    let base = NEXT_BASE_PORT.fetch_add(64, Ordering::Relaxed);
    Config {
        bind_timeout_ms: 2_000,
        base_port: base,
        ..Config::default()
    }
}

pub fn test_server() -> SimServer {
    SimServer::new(test_config())
}

/// A minimal driver stand-in: connects, sends one frame at a time, and reads
/// back the matching reply. Stream ids are reused across calls on the same
/// client since each test issues one request at a time per connection.
pub struct TestClient {
    framed: Framed<TcpStream, CqlFrameCodec>,
    next_stream: i16,
}

impl TestClient {
    pub async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr)
            .await
            .unwrap_or_else(|e| panic!("failed to connect to {addr}: {e}"));
        Self {
            framed: Framed::new(stream, CqlFrameCodec),
            next_stream: 0,
        }
    }

    /// Sends `message` and waits for the reply frame, or `None` if the
    /// connection closed before a reply arrived.
    pub async fn roundtrip(&mut self, message: Message) -> Option<Message> {
        let stream = self.next_stream;
        self.next_stream += 1;
        self.framed
            .send(Envelope::new(stream, message))
            .await
            .expect("send should not fail on a freshly connected socket");
        self.framed
            .next()
            .await
            .map(|r| r.expect("reply frame should decode cleanly").message)
    }

    /// Sends a `Startup` and returns whether a `Ready` (or any response at
    /// all) came back, distinguishing "server replied" from "connection
    /// never responds" (REJECT_STARTUP / closed listener).
    pub async fn startup(&mut self) -> Option<Message> {
        self.roundtrip(Message::Startup {
            options: BTreeMap::new(),
        })
        .await
    }

    /// Sends a `Startup` without waiting for a reply, for asserting the
    /// REJECT_STARTUP case (the frame is silently dropped, so waiting for a
    /// reply the usual way would hang).
    pub async fn send_startup_without_waiting(&mut self) {
        let stream = self.next_stream;
        self.next_stream += 1;
        self.framed
            .send(Envelope::new(
                stream,
                Message::Startup {
                    options: BTreeMap::new(),
                },
            ))
            .await
            .expect("send should not fail on a freshly connected socket");
    }

    pub async fn query(&mut self, query: &str) -> Option<Message> {
        self.roundtrip(Message::Query {
            query: query.to_string(),
            consistency: simulacra::Consistency::One,
            params: Default::default(),
        })
        .await
    }

    /// Reads the next frame without sending anything, or `None` if nothing
    /// arrives within `timeout` (used to assert a dropped Startup produces no
    /// response at all).
    pub async fn try_recv(&mut self, timeout: Duration) -> Option<Message> {
        tokio::time::timeout(timeout, self.framed.next())
            .await
            .ok()
            .flatten()
            .map(|r| r.expect("reply frame should decode cleanly").message)
    }
}
