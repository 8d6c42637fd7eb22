// src/core/protocol/message.rs

//! Typed request/response bodies carried inside an `Envelope`. This is the
//! "Message" half of the trusted-codec boundary described in SPEC_FULL.md: it
//! captures exactly the semantic content the rest of the crate needs (query
//! text, bound parameters, consistency, row payloads) without reproducing the
//! full CQL type system.

use super::consistency::Consistency;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// A single bound value: its declared CQL type name (`"varchar"`, `"bigint"`, ...)
/// plus a JSON-shaped value used for equality matching against primed
/// expectations. Real column-type encoding is left to the external codec this
/// crate stands in for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundValue {
    pub type_name: String,
    pub value: serde_json::Value,
}

/// The bound parameters of a `Query`, `Execute`, or one statement of a `Batch`.
/// A well-formed frame carries either positional or named parameters, never
/// both, mirroring how real drivers encode them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryParams {
    pub positional: Vec<BoundValue>,
    pub named: BTreeMap<String, BoundValue>,
}

impl QueryParams {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// One row of a primed or synthesized result set, in column order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row(pub Vec<serde_json::Value>);

/// The kind of write that timed out or failed, carried on the corresponding
/// error bodies. Field name `write_type` is load-bearing at the JSON boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteType {
    Simple,
    Batch,
    UnloggedBatch,
    Counter,
    BatchLog,
    Cas,
    View,
    Cdc,
}

/// The error family a connection engine can emit as the `Respond` payload of a
/// prime. Field names mirror the ones the spec calls load-bearing at the JSON
/// boundary (`consistency_level`, `received`, `block_for`, `failure_reasons`,
/// `write_type`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorBody {
    ServerError {
        message: String,
    },
    Unavailable {
        consistency_level: Consistency,
        required: i32,
        alive: i32,
    },
    ReadTimeout {
        consistency_level: Consistency,
        received: i32,
        block_for: i32,
        data_present: bool,
    },
    WriteTimeout {
        consistency_level: Consistency,
        received: i32,
        block_for: i32,
        write_type: WriteType,
    },
    ReadFailure {
        consistency_level: Consistency,
        received: i32,
        block_for: i32,
        failure_reasons: Vec<String>,
        data_present: bool,
    },
    WriteFailure {
        consistency_level: Consistency,
        received: i32,
        block_for: i32,
        failure_reasons: Vec<String>,
        write_type: WriteType,
    },
    Unprepared {
        id_hex: String,
        #[serde(with = "hex_bytes")]
        id: Bytes,
    },
    Invalid {
        message: String,
    },
}

mod hex_bytes {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

/// The request and response message bodies this simulator understands, per
/// SPEC_FULL.md §4.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    // --- requests ---
    Startup {
        options: BTreeMap<String, String>,
    },
    Register {
        event_types: Vec<String>,
    },
    Options,
    Query {
        query: String,
        consistency: Consistency,
        params: QueryParams,
    },
    Prepare {
        query: String,
    },
    Execute {
        #[serde(with = "hex_bytes")]
        id: Bytes,
        consistency: Consistency,
        params: QueryParams,
    },
    /// Treated like `Query` for matching purposes; if nothing matches, the
    /// default response is `Void` (SPEC_FULL.md, §3 External Interfaces).
    Batch {
        statements: Vec<(String, QueryParams)>,
        consistency: Consistency,
    },

    // --- responses ---
    Ready,
    Supported {
        options: BTreeMap<String, Vec<String>>,
    },
    SetKeyspace(String),
    Void,
    Rows {
        columns: Vec<(String, String)>,
        rows: Vec<Row>,
    },
    Prepared {
        #[serde(with = "hex_bytes")]
        id: Bytes,
        query: String,
    },
    Error(ErrorBody),
}

impl Message {
    /// A human-readable tag for logging, independent of any particular variant's
    /// payload.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Message::Startup { .. } => "STARTUP",
            Message::Register { .. } => "REGISTER",
            Message::Options => "OPTIONS",
            Message::Query { .. } => "QUERY",
            Message::Prepare { .. } => "PREPARE",
            Message::Execute { .. } => "EXECUTE",
            Message::Batch { .. } => "BATCH",
            Message::Ready => "READY",
            Message::Supported { .. } => "SUPPORTED",
            Message::SetKeyspace(_) => "SET_KEYSPACE",
            Message::Void => "VOID",
            Message::Rows { .. } => "ROWS",
            Message::Prepared { .. } => "PREPARED",
            Message::Error(_) => "ERROR",
        }
    }
}

pub fn no_rows(columns: Vec<(String, String)>) -> Message {
    Message::Rows {
        columns,
        rows: Vec::new(),
    }
}
