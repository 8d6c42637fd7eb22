// src/core/protocol/mod.rs

//! A small, self-contained implementation of the CQL native protocol's frame
//! envelope. The spec treats the real wire codec as a trusted external
//! dependency; this module gives the rest of the crate a typed stand-in for it
//! (`Envelope` + `Message`) without pulling in the full CQL type system, which
//! sits outside this core's scope.

pub mod consistency;
pub mod envelope;
pub mod message;

pub use consistency::Consistency;
pub use envelope::{CqlFrameCodec, Envelope, Opcode};
pub use message::{ErrorBody, Message, QueryParams, Row, WriteType};
