// src/server/registry.rs

//! `SimServer`: the top-level facade a caller owns (SPEC_FULL.md §9,
//! "Process-wide state" — the registry is a field on this value, never a
//! singleton). Combines the bind/lifecycle manager (component E) with the
//! operator surface of SPEC_FULL.md §6/§4.5: `register`/`unregister`,
//! `prime`/`clear`, `reject`/`accept`/`stop`/`start`,
//! `close_connections`/`close_connection`, `connections`, `activity_log`.

use crate::config::Config;
use crate::core::addressing::{AddressResolver, LoopbackAddressResolver};
use crate::core::errors::{CoreError, CoreResult};
use crate::core::node_engine::{NodeDescriptor, NodeEngine, RejectScope};
use crate::core::scope::{DisconnectHow, Scope};
use crate::core::stub::{defaults, Prime, PrimeKind, StubStore};
use crate::core::topology::{
    ActivityLog, ActivityLogEntry, Cluster, ClusterId, DataCenter, DcId, Node, NodeAddress, NodeId,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Per-call override of the bind-timeout budget; `None` falls back to the
/// server's `Config::bind_timeout()`.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    pub bind_timeout: Option<Duration>,
}

/// Everything `SimServer` keeps for one registered cluster: its bound
/// topology, the live `NodeEngine` for each of its nodes (keyed the same way
/// a prime's scope addresses them), and the cluster's activity log.
struct ClusterRuntime {
    topology: RwLock<Cluster>,
    nodes: Arc<DashMap<NodeAddress, Arc<NodeEngine>>>,
    activity_log: Arc<ActivityLog>,
}

/// One bound listener plus the address it ended up on (which may differ from
/// the one requested if the node asked for port 0).
struct BoundListener {
    listener: TcpListener,
    address: SocketAddr,
}

async fn bind_one(node: &Node, resolver: &dyn AddressResolver) -> CoreResult<BoundListener> {
    if let Some(delay) = node.bind_delay {
        tokio::time::sleep(delay).await;
    }
    let address = match node.requested_address {
        Some(addr) => addr,
        None => resolver.next().await?,
    };
    let node_label = node
        .name
        .clone()
        .unwrap_or_else(|| format!("node-{}", node.id.0));
    let listener = TcpListener::bind(address)
        .await
        .map_err(|e| CoreError::BindFailed {
            node: node_label,
            address: address.to_string(),
            cause: e.to_string(),
        })?;
    let bound_address = listener.local_addr()?;
    Ok(BoundListener {
        listener,
        address: bound_address,
    })
}

/// A snapshot of one accepted connection, returned by `SimServer::connections`.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub node: NodeAddress,
    pub remote_addr: SocketAddr,
    pub keyspace: Option<String>,
}

pub struct SimServer {
    config: Config,
    resolver: Arc<dyn AddressResolver>,
    store: Arc<StubStore>,
    clusters: DashMap<ClusterId, Arc<ClusterRuntime>>,
}

impl SimServer {
    /// Builds a server with the default loopback address resolver, seeded
    /// from `config.listen_ip`/`config.base_port`.
    pub fn new(config: Config) -> Self {
        let resolver = Arc::new(resolver_for(&config)) as Arc<dyn AddressResolver>;
        Self::with_resolver(config, resolver)
    }

    /// Builds a server with a caller-supplied resolver (component B is
    /// pluggable, SPEC_FULL.md §4.2).
    pub fn with_resolver(config: Config, resolver: Arc<dyn AddressResolver>) -> Self {
        let store = Arc::new(StubStore::new());
        defaults::install_system_schema_primes(&store);
        Self {
            config,
            resolver,
            store,
            clusters: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ---- component E: bind/lifecycle manager --------------------------

    /// Binds every node in `cluster` concurrently under a single bind-timeout
    /// budget, all-or-nothing (SPEC_FULL.md §4.5). On success the cluster
    /// becomes visible in the registry and a copy with every node's
    /// `bound_address` filled in is returned.
    pub async fn register(&self, cluster: Cluster, opts: RegisterOptions) -> CoreResult<Cluster> {
        let bind_timeout = opts.bind_timeout.unwrap_or_else(|| self.config.bind_timeout());
        let targets = cluster.node_addresses();

        let mut join_set: JoinSet<(NodeAddress, CoreResult<BoundListener>)> = JoinSet::new();
        for (dc_id, node_id) in &targets {
            let node = cluster
                .data_center(*dc_id)
                .and_then(|dc| dc.node(*node_id))
                .expect("node_addresses() only yields existing (dc, node) pairs")
                .clone();
            let address = NodeAddress {
                cluster_id: cluster.id.clone(),
                dc_id: *dc_id,
                node_id: *node_id,
            };
            let resolver = self.resolver.clone();
            join_set.spawn(async move {
                let outcome = bind_one(&node, resolver.as_ref()).await;
                (address, outcome)
            });
        }

        let mut results: HashMap<NodeAddress, CoreResult<BoundListener>> = HashMap::new();
        let collect_all = async {
            while let Some(joined) = join_set.join_next().await {
                if let Ok((address, outcome)) = joined {
                    results.insert(address, outcome);
                }
            }
        };
        let timed_out = tokio::time::timeout(bind_timeout, collect_all).await.is_err();
        // Dropping the JoinSet aborts whatever bind tasks are still running.
        drop(join_set);

        let missing = targets.len().saturating_sub(results.len());
        let first_error = results.values().find_map(|r| r.as_ref().err().cloned());

        if timed_out || missing > 0 || first_error.is_some() {
            for (_, outcome) in results.into_iter() {
                if let Ok(bound) = outcome {
                    drop(bound.listener);
                    self.resolver.release(bound.address).await;
                }
            }
            return Err(match first_error {
                Some(e) if !timed_out && missing == 0 => e,
                _ => CoreError::BindTimeout {
                    pending: missing.max(1),
                },
            });
        }

        // Every node bound successfully: assemble the bound cluster, spin up
        // a `NodeEngine` + accept-loop task per node, and publish it.
        let mut bound_cluster = cluster.clone();
        let nodes_map: Arc<DashMap<NodeAddress, Arc<NodeEngine>>> = Arc::new(DashMap::new());
        let activity_log = ActivityLog::shared();
        if self.config.activity_log_enabled_by_default {
            activity_log.set_enabled(true);
        }

        let mut spawn_specs = Vec::with_capacity(targets.len());
        for (dc_id, node_id) in &targets {
            let address = NodeAddress {
                cluster_id: cluster.id.clone(),
                dc_id: *dc_id,
                node_id: *node_id,
            };
            let bound = results
                .remove(&address)
                .expect("checked above: every target has a result")
                .expect("checked above: every result is Ok");

            let dc = bound_cluster
                .data_centers
                .iter_mut()
                .find(|dc| dc.id == *dc_id)
                .expect("dc_id came from this cluster");
            let node = dc
                .nodes
                .iter_mut()
                .find(|n| n.id == *node_id)
                .expect("node_id came from this cluster");
            node.bound_address = Some(bound.address);

            let descriptor = NodeDescriptor {
                address: address.clone(),
                bound_address: bound.address,
                node: node.clone(),
                dc_name: dc.name.clone(),
                cluster_name: bound_cluster.name.clone(),
            };
            spawn_specs.push((address, descriptor, bound.listener));
        }

        for (address, descriptor, listener) in spawn_specs {
            let (lifecycle_tx, lifecycle_rx) = mpsc::channel(8);
            let engine = Arc::new(NodeEngine::new(
                descriptor.clone(),
                self.store.clone(),
                activity_log.clone(),
                nodes_map.clone(),
                lifecycle_tx,
            ));
            nodes_map.insert(address, engine.clone());
            tokio::spawn(crate::server::listener::run(
                listener,
                descriptor.bound_address,
                engine,
                lifecycle_rx,
            ));
        }

        info!(cluster = %bound_cluster.id, nodes = targets.len(), "cluster registered");

        let runtime = Arc::new(ClusterRuntime {
            topology: RwLock::new(bound_cluster.clone()),
            nodes: nodes_map,
            activity_log,
        });
        self.clusters.insert(bound_cluster.id.clone(), runtime);
        Ok(bound_cluster)
    }

    /// Wraps a standalone `Node` in a hidden single-DC cluster and registers
    /// it (SPEC_FULL.md §4.5). Fails if the node already has a DC parent.
    pub async fn register_node(&self, node: Node, opts: RegisterOptions) -> CoreResult<Cluster> {
        node.validate_standalone()?;
        let cluster = Cluster {
            id: ClusterId::generate(),
            name: None,
            cassandra_version: node.cassandra_version.clone(),
            dse_version: node.dse_version.clone(),
            data_centers: vec![DataCenter {
                id: DcId(0),
                name: None,
                nodes: vec![Node {
                    id: NodeId(0),
                    ..node
                }],
            }],
            activity_log: ActivityLog::shared(),
        };
        self.register(cluster, opts).await
    }

    /// Closes every node of `cluster_id` (unbind listener, disconnect
    /// channels, release its address) and removes it from the registry.
    pub async fn unregister(&self, cluster_id: &ClusterId) -> CoreResult<Cluster> {
        let (_, runtime) = self
            .clusters
            .remove(cluster_id)
            .ok_or_else(|| CoreError::BadArgument(format!("unknown cluster id {cluster_id}")))?;

        let engines: Vec<Arc<NodeEngine>> = runtime.nodes.iter().map(|e| e.value().clone()).collect();
        for engine in engines {
            let bound_address = engine.descriptor.bound_address;
            engine.close().await;
            self.resolver.release(bound_address).await;
        }

        Ok(runtime.topology.read().clone())
    }

    /// Unregisters every currently-registered cluster, returning the count.
    pub async fn unregister_all(&self) -> usize {
        let ids: Vec<ClusterId> = self.clusters.iter().map(|e| e.key().clone()).collect();
        let mut count = 0;
        for id in ids {
            match self.unregister(&id).await {
                Ok(_) => count += 1,
                Err(e) => warn!(cluster = %id, error = %e, "unregister_all: failed to tear down cluster"),
            }
        }
        count
    }

    /// The currently registered cluster with this id, if any (its bound
    /// shape, as last published by `register`).
    pub fn cluster(&self, cluster_id: &ClusterId) -> Option<Cluster> {
        self.clusters.get(cluster_id).map(|r| r.topology.read().clone())
    }

    // ---- component C: stub store operator surface ----------------------

    pub fn prime(&self, prime: Prime) -> Arc<Prime> {
        self.store.add(prime)
    }

    pub fn clear(&self, scope: &Scope, kind: PrimeKind) -> usize {
        self.store.clear(scope, kind)
    }

    pub fn set_activity_log_enabled(&self, cluster_id: &ClusterId, enabled: bool) -> CoreResult<()> {
        let runtime = self
            .clusters
            .get(cluster_id)
            .ok_or_else(|| CoreError::BadArgument(format!("unknown cluster id {cluster_id}")))?;
        runtime.activity_log.set_enabled(enabled);
        Ok(())
    }

    // ---- component D: connection-control surface ------------------------

    pub async fn reject(&self, scope: &Scope, after: u64, reject_scope: RejectScope) {
        for engine in self.nodes_matching(scope) {
            engine.reject_and_apply(after, reject_scope).await;
        }
    }

    pub async fn accept(&self, scope: &Scope) {
        for engine in self.nodes_matching(scope) {
            engine.accept().await;
        }
    }

    /// `stop(scope)` ≡ `reject(scope, 0, STOP)`.
    pub async fn stop(&self, scope: &Scope) {
        self.reject(scope, 0, RejectScope::Stop).await;
    }

    /// `start(scope)` ≡ `accept(scope)`.
    pub async fn start(&self, scope: &Scope) {
        self.accept(scope).await;
    }

    pub async fn close_connections(&self, scope: &Scope, how: DisconnectHow) {
        for engine in self.nodes_matching(scope) {
            engine.close_all_connections(how).await;
        }
    }

    pub async fn close_connection(&self, addr: SocketAddr, how: DisconnectHow) -> CoreResult<()> {
        let engines: Vec<Arc<NodeEngine>> = self
            .clusters
            .iter()
            .flat_map(|cluster| cluster.nodes.iter().map(|e| e.value().clone()).collect::<Vec<_>>())
            .collect();
        for engine in engines {
            if engine.close_connection(addr, how).await {
                return Ok(());
            }
        }
        Err(CoreError::BadArgument(format!(
            "no open connection at {addr}"
        )))
    }

    pub fn connections(&self, scope: &Scope) -> Vec<ConnectionInfo> {
        let mut out = Vec::new();
        for engine in self.nodes_matching(scope) {
            for handle in engine.connection_handles() {
                out.push(ConnectionInfo {
                    node: engine.node_address().clone(),
                    remote_addr: handle.remote_addr,
                    keyspace: handle.keyspace(),
                });
            }
        }
        out
    }

    pub fn activity_log(&self, scope: &Scope) -> Vec<ActivityLogEntry> {
        let mut out = Vec::new();
        for cluster in self.clusters.iter() {
            if let Some(cid) = &scope.cluster_id {
                if cid != cluster.key() {
                    continue;
                }
            }
            out.extend(cluster.activity_log.entries().into_iter().filter(|e| {
                scope.dc_id.is_none_or(|d| d == e.dc_id)
                    && scope.node_id.is_none_or(|n| n == e.node_id)
            }));
        }
        out
    }

    fn nodes_matching(&self, scope: &Scope) -> Vec<Arc<NodeEngine>> {
        let mut out = Vec::new();
        for cluster in self.clusters.iter() {
            if let Some(cid) = &scope.cluster_id {
                if cid != cluster.key() {
                    continue;
                }
            }
            for entry in cluster.nodes.iter() {
                if scope.contains(entry.key()) {
                    out.push(entry.value().clone());
                }
            }
        }
        out
    }
}

fn resolver_for(config: &Config) -> LoopbackAddressResolver {
    let _ = config.listen_ip;
    LoopbackAddressResolver::new(config.base_port)
}
