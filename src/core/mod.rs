// src/core/mod.rs

//! The core simulator logic described in SPEC_FULL.md: the topology model,
//! address resolver, stub store & matcher, and per-node connection engine.
//! The bind/lifecycle manager that wires these together into running
//! listeners lives at `crate::server`, since it is the one component that
//! owns actual sockets rather than pure domain state.

pub mod addressing;
pub mod errors;
pub mod node_engine;
pub mod protocol;
pub mod scope;
pub mod stub;
pub mod topology;

pub use errors::{CoreError, CoreResult};
