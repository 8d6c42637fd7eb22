// src/core/node_engine/engine.rs

//! The per-node connection engine (component D): decodes to dispatch
//! decisions only — no socket IO happens here. A connection task owns the
//! socket and asks `NodeEngine::handle_frame` what to do with each incoming
//! message, then executes the returned `Action` list itself (so `Respond`
//! writes to the socket the caller already holds) except for `Disconnect`,
//! which the engine executes directly since it may need to reach sockets
//! owned by other connections or other nodes.

use super::channel::{ConnectionHandle, ListenerControl};
use super::prepared_cache::PreparedCache;
use super::reject_state::{RejectScope, RejectState, Transition};
use crate::core::protocol::message::ErrorBody;
use crate::core::protocol::{Consistency, Message, QueryParams};
use crate::core::scope::{ActionScope, DisconnectHow, Scope};
use crate::core::stub::{defaults, Action, StubStore};
use crate::core::topology::{ActivityLog, ActivityLogEntry, Node, NodeAddress};
use chrono::Utc;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Everything about a bound node that the engine needs but that never
/// changes once the node is built: denormalized off the topology tree at
/// bind time so the engine doesn't need a reference back into `Cluster`.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub address: NodeAddress,
    pub bound_address: SocketAddr,
    pub node: Node,
    pub dc_name: Option<String>,
    pub cluster_name: Option<String>,
}

pub struct NodeEngine {
    pub descriptor: NodeDescriptor,
    store: Arc<StubStore>,
    prepared: PreparedCache,
    reject_state: RejectState,
    activity_log: Arc<ActivityLog>,
    connections: DashMap<SocketAddr, ConnectionHandle>,
    /// Every node engine of the same cluster, including this one, shared so
    /// `Disconnect` actions scoped to `DataCenter`/`Cluster` can reach peers.
    cluster_nodes: Arc<DashMap<NodeAddress, Arc<NodeEngine>>>,
    lifecycle_tx: mpsc::Sender<ListenerControl>,
}

impl NodeEngine {
    pub fn new(
        descriptor: NodeDescriptor,
        store: Arc<StubStore>,
        activity_log: Arc<ActivityLog>,
        cluster_nodes: Arc<DashMap<NodeAddress, Arc<NodeEngine>>>,
        lifecycle_tx: mpsc::Sender<ListenerControl>,
    ) -> Self {
        Self {
            descriptor,
            store,
            prepared: PreparedCache::new(),
            reject_state: RejectState::new(),
            activity_log,
            connections: DashMap::new(),
            cluster_nodes,
            lifecycle_tx,
        }
    }

    pub fn node_address(&self) -> &NodeAddress {
        &self.descriptor.address
    }

    /// Whether the node's listener should currently be accepting new TCP
    /// connections at all.
    pub fn is_listening(&self) -> bool {
        self.reject_state.is_listening()
    }

    pub fn register_connection(&self, handle: ConnectionHandle) {
        self.connections.insert(handle.remote_addr, handle);
    }

    pub fn unregister_connection(&self, addr: &SocketAddr) {
        self.connections.remove(addr);
    }

    pub fn active_connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connected_addresses(&self) -> Vec<SocketAddr> {
        self.connections.iter().map(|e| *e.key()).collect()
    }

    pub fn connection_handles(&self) -> Vec<ConnectionHandle> {
        self.connections.iter().map(|e| e.value().clone()).collect()
    }

    /// The core dispatch decision for one incoming frame: what action list
    /// to run. Also appends the activity-log entry when logging is enabled.
    ///
    /// `Execute` is matched indirectly (by resolved query text against the
    /// prepared-statement cache, not by a `Matcher` arm of its own), so its
    /// match must be resolved the same way before logging — otherwise the
    /// logged `matched_prime` would never reflect the prime that actually
    /// answered the request.
    pub async fn handle_frame(&self, addr: SocketAddr, message: Message) -> Vec<Action> {
        let resolved_query = match &message {
            Message::Execute { id, .. } => self.prepared.resolve(id),
            _ => None,
        };
        let matched = match (&message, &resolved_query) {
            (Message::Execute { consistency, params, .. }, Some(query_text)) => self
                .store
                .find_for_execute(&self.descriptor.address, query_text, *consistency, params),
            (Message::Execute { .. }, None) => None,
            _ => self.store.find(&self.descriptor.address, &message),
        };
        self.log_activity(addr, &message, matched.as_deref().map(|p| p.id.clone()));

        match &message {
            Message::Startup { .. } | Message::Register { .. } => {
                self.handle_startup(matched).await
            }
            Message::Options => matched
                .map(|p| p.actions.clone())
                .unwrap_or_else(|| vec![Action::respond(defaults::options_response())]),
            Message::Query {
                query,
                consistency: _,
                params: _,
            } => self.handle_query(matched, query),
            Message::Prepare { query } => self.handle_prepare(matched, query),
            Message::Execute { id, .. } => self.handle_execute(resolved_query, matched, id),
            Message::Batch { .. } => matched
                .map(|p| p.actions.clone())
                .unwrap_or_else(|| vec![Action::respond(defaults::void_response())]),
            // Response-shaped kinds never arrive as input; an unrecognized
            // request is simply ignored per the error-handling policy.
            _ => Vec::new(),
        }
    }

    async fn handle_startup(&self, matched: Option<Arc<crate::core::stub::Prime>>) -> Vec<Action> {
        if self.reject_state.should_drop_startup() {
            return Vec::new();
        }
        if let Some(prime) = matched {
            return prime.actions.clone();
        }
        let transition = self.reject_state.on_startup_reached_default();
        let actions = vec![Action::respond(defaults::handshake_response())];
        if let Some(transition) = transition {
            self.apply_transition(transition).await;
        }
        actions
    }

    fn handle_query(&self, matched: Option<Arc<crate::core::stub::Prime>>, query: &str) -> Vec<Action> {
        if let Some(prime) = matched {
            return prime.actions.clone();
        }
        if let Some(keyspace) = defaults::parse_use_keyspace(query) {
            return vec![Action::respond(Message::SetKeyspace(keyspace))];
        }
        if defaults::is_local_or_peers_query(query) {
            return vec![Action::respond(self.local_or_peers_response(query))];
        }
        if defaults::is_system_schema_query(query) {
            return vec![Action::respond(crate::core::protocol::message::no_rows(
                Vec::new(),
            ))];
        }
        vec![Action::respond(defaults::void_response())]
    }

    fn handle_prepare(&self, matched: Option<Arc<crate::core::stub::Prime>>, query: &str) -> Vec<Action> {
        if let Some(prime) = matched {
            return prime.actions.clone();
        }
        let id = self.prepared.register(query);
        if !self.store.has_covering_query_prime(query) {
            let scope = Scope::node(
                self.descriptor.address.cluster_id.clone(),
                self.descriptor.address.dc_id,
                self.descriptor.address.node_id,
            );
            self.store.add(defaults::build_auto_prime(query, scope));
        }
        vec![Action::respond(Message::Prepared {
            id,
            query: query.to_string(),
        })]
    }

    /// `resolved_query` and `matched` are resolved by the caller (`handle_frame`)
    /// since both the activity log and this dispatch need the same
    /// `find_for_execute` lookup against the prepared statement's query text.
    fn handle_execute(
        &self,
        resolved_query: Option<String>,
        matched: Option<Arc<crate::core::stub::Prime>>,
        id: &bytes::Bytes,
    ) -> Vec<Action> {
        if resolved_query.is_none() {
            return vec![Action::respond(Message::Error(ErrorBody::Unprepared {
                id_hex: hex::encode(id),
                id: id.clone(),
            }))];
        }
        if let Some(prime) = matched {
            return prime.actions.clone();
        }
        vec![Action::respond(defaults::void_response())]
    }

    /// Runs a `Disconnect` action. Unlike the other action kinds, this is
    /// executed by the engine itself (not the caller) since it may need to
    /// reach sockets this connection doesn't own.
    pub async fn execute_disconnect(
        &self,
        scope: ActionScope,
        how: DisconnectHow,
        originating_addr: SocketAddr,
    ) {
        match scope {
            ActionScope::Connection => self.shutdown_addr(originating_addr, how).await,
            ActionScope::Node => self.shutdown_all(how).await,
            ActionScope::DataCenter => {
                let dc = self.descriptor.address.dc_id;
                let cluster = self.descriptor.address.cluster_id.clone();
                self.shutdown_matching(how, |addr| addr.cluster_id == cluster && addr.dc_id == dc)
                    .await
            }
            ActionScope::Cluster => {
                let cluster = self.descriptor.address.cluster_id.clone();
                self.shutdown_matching(how, |addr| addr.cluster_id == cluster)
                    .await
            }
        }
    }

    async fn shutdown_addr(&self, addr: SocketAddr, how: DisconnectHow) {
        if let Some(handle) = self.connections.get(&addr) {
            handle.shutdown(how).await;
        }
    }

    async fn shutdown_all(&self, how: DisconnectHow) {
        let handles: Vec<_> = self.connections.iter().map(|e| e.value().clone()).collect();
        for handle in handles {
            handle.shutdown(how).await;
        }
    }

    async fn shutdown_matching(&self, how: DisconnectHow, predicate: impl Fn(&NodeAddress) -> bool) {
        let targets: Vec<_> = self
            .cluster_nodes
            .iter()
            .filter(|e| predicate(e.key()))
            .map(|e| e.value().clone())
            .collect();
        for node in targets {
            node.shutdown_all(how).await;
        }
    }

    /// Closes every accepted channel and unbinds the listener, for
    /// `unregister`/`close()`.
    pub async fn close(&self) {
        self.shutdown_all(DisconnectHow::Disconnect).await;
        let _ = self.lifecycle_tx.send(ListenerControl::Shutdown).await;
    }

    /// Closes every accepted channel matching `how`, without touching the
    /// listener. Used by the operator-facing `close_connections`/
    /// `close_connection` surface (SPEC_FULL.md §6), distinct from the
    /// reject-state-driven `Stop` transition.
    pub async fn close_all_connections(&self, how: DisconnectHow) {
        self.shutdown_all(how).await;
    }

    /// Closes the single connection at `addr` if this node owns it, returning
    /// whether it did.
    pub async fn close_connection(&self, addr: SocketAddr, how: DisconnectHow) -> bool {
        if self.connections.contains_key(&addr) {
            self.shutdown_addr(addr, how).await;
            true
        } else {
            false
        }
    }

    pub fn reject(&self, after: u64, scope: RejectScope) -> Option<Transition> {
        self.reject_state.reject(after, scope)
    }

    pub async fn reject_and_apply(&self, after: u64, scope: RejectScope) {
        if let Some(transition) = self.reject_state.reject(after, scope) {
            self.apply_transition(transition).await;
        }
    }

    pub async fn accept(&self) {
        if let Some(transition) = self.reject_state.accept() {
            self.apply_transition(transition).await;
        }
    }

    async fn apply_transition(&self, transition: Transition) {
        match transition {
            Transition::Unbind => {
                let _ = self.lifecycle_tx.send(ListenerControl::Unbind).await;
            }
            Transition::Stop => {
                self.shutdown_all(DisconnectHow::Disconnect).await;
                let _ = self.lifecycle_tx.send(ListenerControl::Unbind).await;
            }
            Transition::BeginRejectingStartup => {
                debug!(node = %self.descriptor.address, "now rejecting Startup/Register frames");
            }
            Transition::Rebind => {
                let _ = self.lifecycle_tx.send(ListenerControl::Rebind).await;
            }
        }
    }

    fn log_activity(&self, addr: SocketAddr, message: &Message, matched_prime_id: Option<String>) {
        if !self.activity_log.is_enabled() {
            return;
        }
        self.activity_log.record(ActivityLogEntry {
            dc_id: self.descriptor.address.dc_id,
            node_id: self.descriptor.address.node_id,
            remote_addr: addr,
            frame_kind: message.kind_name().to_string(),
            matched_prime_id,
            at: Utc::now(),
        });
    }

    fn local_or_peers_response(&self, query: &str) -> Message {
        let lowered = query.to_ascii_lowercase();
        if lowered.contains("system.local") {
            self.local_row()
        } else {
            self.peers_rows()
        }
    }

    fn local_row(&self) -> Message {
        let columns = vec![
            ("key".to_string(), "text".to_string()),
            ("data_center".to_string(), "text".to_string()),
            ("host_id".to_string(), "uuid".to_string()),
            ("rpc_address".to_string(), "inet".to_string()),
            ("release_version".to_string(), "text".to_string()),
            ("cluster_name".to_string(), "text".to_string()),
            ("tokens".to_string(), "set<text>".to_string()),
        ];
        let row = crate::core::protocol::Row(vec![
            serde_json::json!("local"),
            serde_json::json!(self.descriptor.dc_name),
            serde_json::json!(host_id_for(&self.descriptor.address)),
            serde_json::json!(self.descriptor.bound_address.ip().to_string()),
            serde_json::json!(self.descriptor.node.cassandra_version),
            serde_json::json!(self.descriptor.cluster_name),
            serde_json::json!([self.descriptor.node.token.clone()]),
        ]);
        Message::Rows {
            columns,
            rows: vec![row],
        }
    }

    fn peers_rows(&self) -> Message {
        let columns = vec![
            ("peer".to_string(), "inet".to_string()),
            ("data_center".to_string(), "text".to_string()),
            ("host_id".to_string(), "uuid".to_string()),
            ("rpc_address".to_string(), "inet".to_string()),
            ("release_version".to_string(), "text".to_string()),
            ("tokens".to_string(), "set<text>".to_string()),
        ];
        let rows = self
            .cluster_nodes
            .iter()
            .filter(|e| *e.key() != self.descriptor.address)
            .map(|e| {
                let d = &e.value().descriptor;
                crate::core::protocol::Row(vec![
                    serde_json::json!(d.bound_address.ip().to_string()),
                    serde_json::json!(d.dc_name),
                    serde_json::json!(host_id_for(&d.address)),
                    serde_json::json!(d.bound_address.ip().to_string()),
                    serde_json::json!(d.node.cassandra_version),
                    serde_json::json!([d.node.token.clone()]),
                ])
            })
            .collect();
        Message::Rows { columns, rows }
    }
}

fn host_id_for(address: &NodeAddress) -> String {
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_DNS, address.to_string().as_bytes()).to_string()
}

impl std::fmt::Debug for NodeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeEngine")
            .field("descriptor", &self.descriptor)
            .field("connections", &self.connections.len())
            .finish()
    }
}
