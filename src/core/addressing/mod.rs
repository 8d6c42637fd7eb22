// src/core/addressing/mod.rs

//! Pluggable allocation of the socket addresses a bound node listens on
//! (component B, SPEC_FULL.md §3). The bind manager asks a resolver for an
//! address per node and releases it again on unregister, so operators can
//! substitute a resolver that hands out addresses from an external pool
//! (e.g. a CI runner's allotted port range) instead of the built-in one.

use crate::core::errors::CoreResult;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};

/// Hands out and reclaims the socket addresses nodes bind to.
///
/// Implementations must be safe to call from many concurrent binds: the bind
/// manager may call `next()` for every node of a topology concurrently before
/// any of them calls `release()`.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn next(&self) -> CoreResult<SocketAddr>;
    async fn release(&self, address: SocketAddr);
}

/// The default resolver: hands out successive ports on a fixed loopback IP,
/// starting at a configurable base port. Released ports are not reused within
/// the process lifetime; a monotonic counter is simpler to reason about than
/// a freelist and the port range comfortably covers a test process's
/// lifetime.
pub struct LoopbackAddressResolver {
    ip: IpAddr,
    next_port: AtomicU16,
}

impl LoopbackAddressResolver {
    pub fn new(base_port: u16) -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            next_port: AtomicU16::new(base_port),
        }
    }
}

impl Default for LoopbackAddressResolver {
    fn default() -> Self {
        Self::new(9042)
    }
}

#[async_trait]
impl AddressResolver for LoopbackAddressResolver {
    async fn next(&self) -> CoreResult<SocketAddr> {
        let port = self.next_port.fetch_add(1, Ordering::Relaxed);
        if port == 0 {
            return Err(crate::core::errors::CoreError::Internal(
                "address range exhausted".into(),
            ));
        }
        Ok(SocketAddr::new(self.ip, port))
    }

    async fn release(&self, _address: SocketAddr) {
        // Ports are not reclaimed; the range is large enough for a test
        // process's lifetime and reuse risks racing a not-yet-closed socket.
    }
}
