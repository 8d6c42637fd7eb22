// src/core/stub/store.rs

//! The global prime store (component C). One store serves every registered
//! cluster: visibility is controlled entirely by each prime's `Scope`, so
//! there is no benefit to partitioning storage per node. Appends are
//! protected by a `parking_lot::RwLock`; `find` takes a read lock and walks
//! a consistent snapshot, matching the "readers never see a half-installed
//! prime" guarantee in SPEC_FULL.md §5.

use super::matcher::normalize;
use super::prime::{Prime, PrimeKind};
use crate::core::protocol::{Consistency, Message, QueryParams};
use crate::core::scope::Scope;
use crate::core::topology::NodeAddress;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Default)]
pub struct StubStore {
    primes: RwLock<Vec<Arc<Prime>>>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a prime. Insertion order only breaks ties within a
    /// `PrimeKind`: `find` always prefers a matching `User` prime over a
    /// matching `Internal` one regardless of when each was added, since
    /// internal primes (built-in system-schema rows, auto-prime-on-Prepare)
    /// are installed as fallbacks, not overrides.
    pub fn add(&self, prime: Prime) -> Arc<Prime> {
        let prime = Arc::new(prime);
        self.primes.write().push(prime.clone());
        prime
    }

    pub fn find(&self, addr: &NodeAddress, message: &Message) -> Option<Arc<Prime>> {
        let primes = self.primes.read();
        let matches = |p: &&Arc<Prime>| p.scope.contains(addr) && p.matcher.matches(message);
        primes
            .iter()
            .find(|p| p.kind == PrimeKind::User && matches(p))
            .or_else(|| primes.iter().find(|p| p.kind == PrimeKind::Internal && matches(p)))
            .cloned()
    }

    /// Resolves an `Execute` by re-running `Query` matching against the
    /// already-prepared query text, per SPEC_FULL.md §4.3.
    pub fn find_for_execute(
        &self,
        addr: &NodeAddress,
        query_text: &str,
        consistency: Consistency,
        params: &QueryParams,
    ) -> Option<Arc<Prime>> {
        let synthetic = Message::Query {
            query: query_text.to_string(),
            consistency,
            params: params.clone(),
        };
        self.find(addr, &synthetic)
    }

    /// Whether some existing prime (user or internal) already answers this
    /// exact query text, so a fresh `Prepare` doesn't need its own
    /// auto-registered skeleton. Primes marked `ignore_on_prepare` don't
    /// count.
    pub fn has_covering_query_prime(&self, query_text: &str) -> bool {
        let normalized = normalize(query_text);
        self.primes.read().iter().any(|p| {
            !p.ignore_on_prepare
                && p.matcher
                    .query_text()
                    .is_some_and(|q| normalize(q) == normalized)
        })
    }

    /// Removes every prime of `kind` whose scope is reached by `clear_scope`,
    /// returning the count removed.
    pub fn clear(&self, clear_scope: &Scope, kind: PrimeKind) -> usize {
        let mut primes = self.primes.write();
        let before = primes.len();
        primes.retain(|p| !(p.kind == kind && scope_reached_by(clear_scope, &p.scope)));
        before - primes.len()
    }

    pub fn all(&self) -> Vec<Arc<Prime>> {
        self.primes.read().clone()
    }
}

fn scope_reached_by(clear_scope: &Scope, prime_scope: &Scope) -> bool {
    if let Some(c) = &clear_scope.cluster_id
        && prime_scope.cluster_id.as_ref() != Some(c)
    {
        return false;
    }
    if let Some(d) = &clear_scope.dc_id
        && prime_scope.dc_id != Some(*d)
    {
        return false;
    }
    if let Some(n) = &clear_scope.node_id
        && prime_scope.node_id != Some(*n)
    {
        return false;
    }
    true
}
