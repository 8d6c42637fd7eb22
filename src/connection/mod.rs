// src/connection/mod.rs

//! The per-connection task (the socket-owning half of component D,
//! SPEC_FULL.md §4.4): frame IO and action execution live here, while
//! `NodeEngine` in `crate::core::node_engine` decides what to do with each
//! frame.

mod guard;
mod handler;

pub use guard::ConnectionGuard;
pub use handler::handle_connection;
