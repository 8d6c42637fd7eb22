// src/core/node_engine/reject_state.rs

//! Per-node reject-state machine (SPEC_FULL.md §3/§4.4). A single
//! `parking_lot::Mutex` guards every field so concurrent `reject`/`accept`
//! calls can't interleave into an inconsistent combination — the spec only
//! promises the final state matches whichever call completed last, which a
//! single critical section gives for free.

use serde::{Deserialize, Serialize};

/// What a scheduled (or immediate) reject transition does once it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectScope {
    Unbind,
    Stop,
    RejectStartup,
    /// The default steady state: accept everything normally.
    None,
}

struct Inner {
    listening: bool,
    /// Startups remaining before the scheduled transition fires. `None`
    /// means no countdown is pending (either nothing scheduled, or a
    /// zero-delay transition already applied).
    remaining: Option<u64>,
    pending_scope: RejectScope,
    /// Whether `RejectScope::RejectStartup` is currently in steady effect
    /// (distinct from `pending_scope`, which is what fires once `remaining`
    /// hits zero).
    rejecting_startup: bool,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            listening: true,
            remaining: None,
            pending_scope: RejectScope::None,
            rejecting_startup: false,
        }
    }
}

/// The action a caller must actually perform (unbind the listener, close
/// channels, ...) as a consequence of a state transition. `RejectState`
/// itself only tracks bookkeeping; the connection engine performs the
/// corresponding IO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unbind,
    Stop,
    BeginRejectingStartup,
    Rebind,
}

pub struct RejectState {
    inner: parking_lot::Mutex<Inner>,
}

impl Default for RejectState {
    fn default() -> Self {
        Self {
            inner: parking_lot::Mutex::new(Inner::default()),
        }
    }
}

impl RejectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether new connections should currently be accepted at all (mirrors
    /// `listening_for_new_connections`, independent of `REJECT_STARTUP`).
    pub fn is_listening(&self) -> bool {
        self.inner.lock().listening
    }

    /// Whether a `Startup`/`Register` arriving right now must be silently
    /// dropped rather than handed to the default-response path.
    pub fn should_drop_startup(&self) -> bool {
        self.inner.lock().rejecting_startup
    }

    /// `reject(after, scope)`. Returns the transition to apply immediately,
    /// if any (only ever non-`None` when `after == 0`).
    pub fn reject(&self, after: u64, scope: RejectScope) -> Option<Transition> {
        let mut inner = self.inner.lock();
        if after == 0 {
            inner.remaining = None;
            apply(&mut inner, scope)
        } else {
            inner.remaining = Some(after);
            inner.pending_scope = scope;
            None
        }
    }

    /// Call exactly when a `Startup`/`Register` is about to take the default
    /// `Ready` path (i.e. it was not dropped by `should_drop_startup`).
    /// Returns the transition to apply, if the countdown just reached zero.
    pub fn on_startup_reached_default(&self) -> Option<Transition> {
        let mut inner = self.inner.lock();
        let Some(remaining) = inner.remaining else {
            return None;
        };
        if remaining <= 1 {
            inner.remaining = None;
            let scope = inner.pending_scope;
            apply(&mut inner, scope)
        } else {
            inner.remaining = Some(remaining - 1);
            None
        }
    }

    /// `accept()`. Returns `Transition::Rebind` if the listener was unbound
    /// and must be rebound on the same address.
    pub fn accept(&self) -> Option<Transition> {
        let mut inner = self.inner.lock();
        let was_listening = inner.listening;
        *inner = Inner::default();
        if was_listening {
            None
        } else {
            Some(Transition::Rebind)
        }
    }
}

fn apply(inner: &mut Inner, scope: RejectScope) -> Option<Transition> {
    match scope {
        RejectScope::Unbind => {
            inner.listening = false;
            Some(Transition::Unbind)
        }
        RejectScope::Stop => {
            inner.listening = false;
            Some(Transition::Stop)
        }
        RejectScope::RejectStartup => {
            inner.rejecting_startup = true;
            Some(Transition::BeginRejectingStartup)
        }
        RejectScope::None => None,
    }
}
