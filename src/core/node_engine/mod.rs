// src/core/node_engine/mod.rs

//! The per-connection protocol engine (component D, SPEC_FULL.md §4.4): frame
//! dispatch, default responses, reject-state machine, and prepared-statement
//! bookkeeping. `NodeEngine` itself decides *what* to do with a frame; actual
//! socket IO is driven by `crate::server::listener` and `crate::connection`.

pub mod channel;
pub mod engine;
pub mod prepared_cache;
pub mod reject_state;

pub use channel::{ConnectionHandle, ControlMsg, ListenerControl};
pub use engine::{NodeDescriptor, NodeEngine};
pub use prepared_cache::PreparedCache;
pub use reject_state::{RejectScope, RejectState, Transition};
