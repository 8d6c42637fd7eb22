// src/core/errors.rs

//! Defines the primary error type surfaced by the simulator's public API.

use std::sync::Arc;
use thiserror::Error;

/// The error type returned by the operator-facing API (`SimServer` and friends).
///
/// Mirrors the teacher crate's flat, `thiserror`-derived error enum: each variant
/// carries exactly what a caller needs to react, nothing more.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// A caller-supplied argument was invalid: an unknown cluster id, a node that
    /// already has a parent data center passed to a standalone-register call, a
    /// connection address that isn't currently open, etc.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Binding a node's listener failed outright (address in use, OS rejected the
    /// bind, etc).
    #[error("bind failed for node {node} at {address}: {cause}")]
    BindFailed {
        node: String,
        address: String,
        cause: String,
    },

    /// The overall registration bind-timeout budget elapsed with at least one bind
    /// still pending.
    #[error("registration timed out waiting for {pending} node(s) to bind")]
    BindTimeout { pending: usize },

    /// A frame arrived that the protocol codec could not decode. The connection
    /// that produced it is closed; the rest of the node keeps running.
    #[error("malformed frame from client: {0}")]
    CodecError(String),

    /// An I/O failure not otherwise classified above.
    #[error("io error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    /// Anything else internal that should never normally surface.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Io(Arc::new(e))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
