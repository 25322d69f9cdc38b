//! Network of node processes running on the local machine
//!
//! [`LocalNetwork`] owns every node it starts. The node map, the lifecycle
//! flag and the name registry sit behind a single lock that is only held
//! while they are read or edited, never while a process is being started,
//! stopped or waited on.
//!
//! ## Construction
//!
//! ```text
//! validate ──► resolve names ──► prepare every node ──► start in order
//!                                (staking, ports,         │
//!                                 files; no process)      ├─ ok: network returned
//!                                                         └─ err: stop started nodes,
//!                                                                 return the error
//! ```
//!
//! ## Lifecycle
//!
//! `Running` is the only initial state and `Stopped` is terminal. Once
//! stopped, every operation returns [`NetworkError::Stopped`].

pub mod args;
pub mod files;

pub use args::{BootstrapPeer, NodeArgs};
pub use files::{free_ports, NetworkDir, NodeFiles};

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::ApiClientFactory;
use crate::config::{NetworkConfig, NodeConfig};
use crate::error::{NetworkError, NetworkResult};
use crate::naming::NameRegistry;
use crate::network::{Network, DEFAULT_STOP_GRACE};
use crate::node::Node;
use crate::process::{NodeProcess, NodeProcessFactory};
use crate::staking::{self, NodeId};
use crate::validation::{validate_network_config, validate_node_config};

/// Timeout applied to every API request made by node clients
pub const DEFAULT_API_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const API_HOST: &str = "127.0.0.1";

/// Tunables of a [`LocalNetwork`]
#[derive(Debug, Clone)]
pub struct LocalNetworkOptions {
    /// Directory for network files; a temporary directory when unset
    pub root_dir: Option<PathBuf>,
    /// Request timeout handed to the API client factory
    pub api_request_timeout: Duration,
    /// How long a removed or rolled-back node may take to exit
    pub stop_grace: Duration,
}

impl Default for LocalNetworkOptions {
    fn default() -> Self {
        Self {
            root_dir: None,
            api_request_timeout: DEFAULT_API_REQUEST_TIMEOUT,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Running,
    Stopped,
}

/// A started node together with the resources only the network may touch
struct ManagedNode {
    node: Node,
    process: Arc<dyn NodeProcess>,
    exit_watcher: JoinHandle<()>,
}

struct NetworkState {
    status: NetworkStatus,
    nodes: HashMap<String, ManagedNode>,
    names: NameRegistry,
    /// API and staking ports of present and starting nodes
    ports: HashSet<u16>,
}

/// Everything needed to start a node, before any process exists
struct PreparedNode {
    config: NodeConfig,
    node_id: NodeId,
    api_port: u16,
    staking_port: u16,
    files: NodeFiles,
    extra_args: Vec<String>,
}

impl PreparedNode {
    fn bootstrap_peer(&self) -> BootstrapPeer {
        BootstrapPeer {
            name: self.config.name.clone(),
            node_id: self.node_id,
            address: format!("{}:{}", API_HOST, self.staking_port),
        }
    }
}

/// A network of node binaries started as local processes
pub struct LocalNetwork {
    name: String,
    log_level: String,
    genesis: Vec<u8>,
    genesis_path: PathBuf,
    dir: NetworkDir,
    options: LocalNetworkOptions,
    api_factory: Arc<dyn ApiClientFactory>,
    process_factory: Arc<dyn NodeProcessFactory>,
    state: Mutex<NetworkState>,
    stopped_tx: watch::Sender<bool>,
}

impl LocalNetwork {
    /// Validate `config` and start every node it declares
    pub async fn new<A, P>(config: NetworkConfig, api_factory: A, process_factory: P) -> NetworkResult<Self>
    where
        A: ApiClientFactory + 'static,
        P: NodeProcessFactory + 'static,
    {
        Self::with_options(config, api_factory, process_factory, LocalNetworkOptions::default()).await
    }

    /// Like [`LocalNetwork::new`] with explicit options
    ///
    /// Either every configured node is started and the network is returned,
    /// or the nodes started so far are stopped and the first error is
    /// returned.
    pub async fn with_options<A, P>(
        config: NetworkConfig,
        api_factory: A,
        process_factory: P,
        options: LocalNetworkOptions,
    ) -> NetworkResult<Self>
    where
        A: ApiClientFactory + 'static,
        P: NodeProcessFactory + 'static,
    {
        validate_network_config(&config)?;

        let NetworkConfig {
            genesis,
            log_level,
            name,
            node_configs,
        } = config;

        let mut names = NameRegistry::new();
        let resolved = names.resolve_batch(&node_configs)?;

        let assigned = assign_ports(&node_configs, &HashSet::new())?;
        let ports: HashSet<u16> = assigned.iter().flat_map(|(api, staking)| [*api, *staking]).collect();

        let dir = NetworkDir::create(options.root_dir.as_deref())?;
        let genesis_path = dir.write_genesis(&genesis)?;

        let prepared = node_configs
            .into_iter()
            .zip(resolved)
            .zip(assigned)
            .map(|((config, node_name), ports)| prepare_node(&dir, config, node_name, ports))
            .collect::<NetworkResult<Vec<_>>>()?;

        info!(
            "Starting network '{}' with {} node(s) in {}",
            name,
            prepared.len(),
            dir.root().display()
        );

        let (stopped_tx, _) = watch::channel(false);
        let network = Self {
            name,
            log_level,
            genesis,
            genesis_path,
            dir,
            options,
            api_factory: Arc::new(api_factory),
            process_factory: Arc::new(process_factory),
            state: Mutex::new(NetworkState {
                status: NetworkStatus::Running,
                nodes: HashMap::new(),
                names,
                ports,
            }),
            stopped_tx,
        };

        let beacons: Vec<BootstrapPeer> = prepared
            .iter()
            .filter(|node| node.config.is_beacon)
            .map(PreparedNode::bootstrap_peer)
            .collect();

        let mut started = Vec::with_capacity(prepared.len());
        for node in prepared {
            let bootstrap = beacons
                .iter()
                .filter(|peer| peer.name != node.config.name)
                .cloned()
                .collect();
            match network.launch(node, bootstrap).await {
                Ok(managed) => started.push(managed),
                Err(err) => {
                    error!("Failed to start network '{}': {}", network.name, err);
                    network.rollback(started).await;
                    return Err(err);
                }
            }
        }

        {
            let mut state = network.state.lock();
            for managed in started {
                state.nodes.insert(managed.node.name().to_string(), managed);
            }
        }

        info!("Network '{}' started", network.name);
        Ok(network)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn genesis(&self) -> &[u8] {
        &self.genesis
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Directory holding the genesis file and per-node files
    pub fn root_dir(&self) -> &Path {
        self.dir.root()
    }

    pub fn status(&self) -> NetworkStatus {
        self.state.lock().status
    }

    /// Build the command line, API client and process for a node and start it
    async fn launch(
        &self,
        node: PreparedNode,
        bootstrap: Vec<BootstrapPeer>,
    ) -> NetworkResult<ManagedNode> {
        let name = node.config.name.clone();
        let args = NodeArgs {
            log_level: self.log_level.clone(),
            genesis_path: self.genesis_path.clone(),
            staking_key_path: node.files.staking_key.clone(),
            staking_cert_path: node.files.staking_cert.clone(),
            http_port: node.api_port,
            staking_port: node.staking_port,
            db_dir: node.files.db_dir.clone(),
            log_dir: node.files.log_dir.clone(),
            bootstrap,
            extra_args: node.extra_args.clone(),
        }
        .to_args();
        debug!("Node '{}' arguments: {:?}", name, args);

        let api = self
            .api_factory
            .new_client(API_HOST, node.api_port, self.options.api_request_timeout);

        let process = match self.process_factory.new_process(&node.config, &args) {
            Ok(process) => process,
            Err(err) => {
                api.close().await;
                return Err(NetworkError::startup(&name, err));
            }
        };

        if let Err(err) = process.start().await {
            if let Err(stop_err) = process.stop().await {
                warn!("Failed to clean up node '{}' after failed start: {}", name, stop_err);
            }
            api.close().await;
            return Err(NetworkError::startup(&name, err));
        }

        let exit_watcher = spawn_exit_watcher(name.clone(), Arc::clone(&process));
        info!("Started node '{}' ({})", name, node.node_id);

        Ok(ManagedNode {
            node: Node::new(
                name,
                node.node_id,
                node.config.is_beacon,
                API_HOST.to_string(),
                node.api_port,
                node.staking_port,
                api,
            ),
            process,
            exit_watcher,
        })
    }

    /// Best-effort stop of nodes started before a construction failure
    async fn rollback(&self, started: Vec<ManagedNode>) {
        let grace = self.options.stop_grace;
        let results = join_all(started.into_iter().map(|managed| async move {
            let name = managed.node.name().to_string();
            (name, shutdown_node(managed, grace).await)
        }))
        .await;

        for (name, result) in results {
            if let Err(err) = result {
                warn!("Failed to stop node '{}' during rollback: {}", name, err);
            }
        }
    }
}

#[async_trait]
impl Network for LocalNetwork {
    async fn add_node(&self, config: NodeConfig) -> NetworkResult<Node> {
        let (name, ports, bootstrap) = {
            let mut state = self.state.lock();
            ensure_running(&state)?;
            validate_node_config(&config)?;
            let ports = assign_ports(std::slice::from_ref(&config), &state.ports)?
                .pop()
                .ok_or_else(|| NetworkError::internal("no ports assigned"))?;
            let name = state.names.claim(&config.name)?;
            state.ports.extend([ports.0, ports.1]);
            let bootstrap: Vec<BootstrapPeer> = state
                .nodes
                .values()
                .filter(|managed| managed.node.is_beacon())
                .map(|managed| BootstrapPeer {
                    name: managed.node.name().to_string(),
                    node_id: managed.node.node_id(),
                    address: managed.node.staking_address(),
                })
                .collect();
            (name, ports, bootstrap)
        };

        let launched = match prepare_node(&self.dir, config, name.clone(), ports) {
            Ok(prepared) => self.launch(prepared, bootstrap).await,
            Err(err) => Err(err),
        };

        let managed = match launched {
            Ok(managed) => managed,
            Err(err) => {
                let mut state = self.state.lock();
                state.names.release(&name);
                state.ports.remove(&ports.0);
                state.ports.remove(&ports.1);
                return Err(err);
            }
        };

        let rejected = {
            let mut state = self.state.lock();
            if state.status == NetworkStatus::Running {
                let node = managed.node.clone();
                state.nodes.insert(name.clone(), managed);
                info!("Added node '{}' to network '{}'", name, self.name);
                return Ok(node);
            }
            managed
        };

        warn!("Network stopped while node '{}' was starting, shutting it down", name);
        if let Err(err) = shutdown_node(rejected, self.options.stop_grace).await {
            warn!("Failed to stop node '{}': {}", name, err);
        }
        Err(NetworkError::Stopped)
    }

    async fn remove_node(&self, name: &str) -> NetworkResult<()> {
        let managed = {
            let mut state = self.state.lock();
            ensure_running(&state)?;
            state
                .nodes
                .remove(name)
                .ok_or_else(|| NetworkError::node_not_found(name))?
        };

        info!("Removing node '{}' from network '{}'", name, self.name);
        let ports = [managed.node.api_port(), managed.node.staking_port()];
        let result = shutdown_node(managed, self.options.stop_grace).await;

        // The node's directory and ports are only reusable once its process is gone
        {
            let mut state = self.state.lock();
            state.names.release(name);
            for port in ports {
                state.ports.remove(&port);
            }
        }

        result.map_err(|err| NetworkError::ShutdownFailed {
            failures: vec![(name.to_string(), err)],
        })
    }

    async fn get_node(&self, name: &str) -> NetworkResult<Node> {
        let state = self.state.lock();
        ensure_running(&state)?;
        state
            .nodes
            .get(name)
            .map(|managed| managed.node.clone())
            .ok_or_else(|| NetworkError::node_not_found(name))
    }

    async fn get_nodes_names(&self) -> NetworkResult<Vec<String>> {
        let state = self.state.lock();
        ensure_running(&state)?;
        let mut names: Vec<String> = state.nodes.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn stop(&self, grace: Duration) -> NetworkResult<()> {
        let nodes: Vec<ManagedNode> = {
            let mut state = self.state.lock();
            ensure_running(&state)?;
            state.status = NetworkStatus::Stopped;
            state.nodes.drain().map(|(_, managed)| managed).collect()
        };
        self.stopped_tx.send_replace(true);

        info!("Stopping network '{}' ({} node(s))", self.name, nodes.len());
        let results = join_all(nodes.into_iter().map(|managed| async move {
            let name = managed.node.name().to_string();
            (name, shutdown_node(managed, grace).await)
        }))
        .await;

        let failures: Vec<(String, NetworkError)> = results
            .into_iter()
            .filter_map(|(name, result)| result.err().map(|err| (name, err)))
            .collect();

        if failures.is_empty() {
            info!("Network '{}' stopped", self.name);
            Ok(())
        } else {
            for (name, err) in &failures {
                warn!("Failed to stop node '{}': {}", name, err);
            }
            Err(NetworkError::ShutdownFailed { failures })
        }
    }

    async fn stopped(&self) {
        let mut rx = self.stopped_tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Dropping a running network kills its remaining processes
///
/// Kills are issued from spawned tasks, so they only happen while a tokio
/// runtime is available; call [`Network::stop`] for an orderly shutdown.
impl Drop for LocalNetwork {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.status != NetworkStatus::Running || state.nodes.is_empty() {
            return;
        }
        state.status = NetworkStatus::Stopped;
        self.stopped_tx.send_replace(true);

        let nodes: Vec<ManagedNode> = state.nodes.drain().map(|(_, managed)| managed).collect();
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(
                    "Network '{}' dropped outside a runtime, {} node process(es) left running",
                    self.name,
                    nodes.len()
                );
                return;
            }
        };

        warn!(
            "Network '{}' dropped without stop, killing {} node(s)",
            self.name,
            nodes.len()
        );
        for managed in nodes {
            runtime.spawn(async move {
                let ManagedNode {
                    node,
                    process,
                    exit_watcher,
                } = managed;
                exit_watcher.abort();
                if let Err(err) = process.kill().await {
                    warn!("Failed to kill node '{}': {}", node.name(), err);
                }
                node.api().close().await;
            });
        }
    }
}

fn ensure_running(state: &NetworkState) -> NetworkResult<()> {
    match state.status {
        NetworkStatus::Running => Ok(()),
        NetworkStatus::Stopped => Err(NetworkError::Stopped),
    }
}

/// Pick the API and staking port of every config
///
/// Ports set in [`LocalNodeConfig`](crate::config::LocalNodeConfig) are kept,
/// and the rest are allocated in one batch that avoids `in_use` and every
/// explicit port.
fn assign_ports(configs: &[NodeConfig], in_use: &HashSet<u16>) -> NetworkResult<Vec<(u16, u16)>> {
    let wanted: Vec<(Option<u16>, Option<u16>)> = configs
        .iter()
        .map(|config| {
            config
                .local_config()
                .map(|local| (local.api_port, local.staking_port))
                .unwrap_or((None, None))
        })
        .collect();

    let mut taken = in_use.clone();
    for (api, staking) in &wanted {
        for port in [api, staking].into_iter().flatten() {
            if !taken.insert(*port) {
                return Err(NetworkError::validation(
                    "impl_specific",
                    format!("port {} is already used by another node", port),
                ));
            }
        }
    }

    let missing = wanted
        .iter()
        .map(|(api, staking)| usize::from(api.is_none()) + usize::from(staking.is_none()))
        .sum();
    let mut free = free_ports(missing, &taken)?.into_iter();
    let mut next = |explicit: Option<u16>| -> NetworkResult<u16> {
        match explicit {
            Some(port) => Ok(port),
            None => free
                .next()
                .ok_or_else(|| NetworkError::internal("ran out of allocated ports")),
        }
    };

    wanted
        .into_iter()
        .map(|(api, staking)| -> NetworkResult<(u16, u16)> { Ok((next(api)?, next(staking)?)) })
        .collect()
}

/// Resolve staking material, identity and files for a node
fn prepare_node(
    dir: &NetworkDir,
    mut config: NodeConfig,
    name: String,
    (api_port, staking_port): (u16, u16),
) -> NetworkResult<PreparedNode> {
    config.name = name;

    if config.staking_key.is_empty() && config.staking_cert.is_empty() {
        debug!("Generating staking material for node '{}'", config.name);
        let material = staking::new_cert_and_key()?;
        config.staking_key = material.key_pem;
        config.staking_cert = material.cert_pem;
    }
    let node_id = staking::node_id_from_cert(&config.staking_cert)?;

    let local = config.local_config().ok_or_else(|| {
        NetworkError::validation("impl_specific", "implementation-specific config is missing")
    })?;
    let extra_args = local.extra_args.clone();

    let files = dir.write_node_files(&config.name, &config.staking_key, &config.staking_cert)?;

    Ok(PreparedNode {
        config,
        node_id,
        api_port,
        staking_port,
        files,
        extra_args,
    })
}

fn spawn_exit_watcher(name: String, process: Arc<dyn NodeProcess>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match process.wait().await {
            Ok(()) => info!("Node '{}' exited", name),
            Err(err) => warn!("Node '{}' exited abnormally: {}", name, err),
        }
    })
}

/// Stop a node's process, kill it if it outlives `grace`, close its client
async fn shutdown_node(managed: ManagedNode, grace: Duration) -> NetworkResult<()> {
    let ManagedNode {
        node,
        process,
        mut exit_watcher,
    } = managed;

    let stop_result = process.stop().await;
    if let Err(err) = &stop_result {
        warn!("Stop request for node '{}' failed: {}", node.name(), err);
    }

    let result = match tokio::time::timeout(grace, &mut exit_watcher).await {
        Ok(_) => stop_result,
        Err(_) => {
            warn!("Node '{}' still running after {:?}, killing it", node.name(), grace);
            let kill_result = process.kill().await;
            exit_watcher.abort();
            stop_result.and(kill_result)
        }
    };

    node.api().close().await;
    result
}
