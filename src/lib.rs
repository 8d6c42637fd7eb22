// src/lib.rs

//! An embeddable simulator of a Cassandra-compatible cluster for driver
//! testing: declare a topology, register it, prime canned responses, and
//! drive connection/listener behavior from test code instead of a real
//! cluster.

pub mod config;
pub mod connection;
pub mod core;
pub mod server;

pub use crate::config::Config;
pub use crate::core::addressing::{AddressResolver, LoopbackAddressResolver};
pub use crate::core::errors::{CoreError, CoreResult};
pub use crate::core::node_engine::RejectScope;
pub use crate::core::protocol::{
    Consistency, CqlFrameCodec, Envelope, ErrorBody, Message, Opcode, QueryParams, Row, WriteType,
};
pub use crate::core::scope::{ActionScope, DisconnectHow, Scope};
pub use crate::core::stub::{
    Action, ExpectedParams, ExpectedValue, ExpectedValueKind, Matcher, Prime, PrimeKind, QueryMatcher,
};
pub use crate::core::topology::{
    ActivityLog, ActivityLogEntry, Cluster, ClusterBuilder, ClusterId, DataCenter, DataCenterBuilder,
    DcId, Node, NodeAddress, NodeBuilder, NodeId,
};
pub use crate::server::{ConnectionInfo, RegisterOptions, SimServer};
