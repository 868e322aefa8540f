//! The network coordinator.
//!
//! A [`Network`] takes a graph definition and brings it to life in four
//! strictly ordered phases - nodes, edges, initial packets, defaults -
//! then drives the running system: it multiplexes socket and component
//! events onto one outbound stream, detects quiescence, and tears the
//! network back down on `stop`.
//!
//! ```text
//!        connect()                       start()
//! graph ─────────────► processes ────────────────────► running
//!                      + sockets    components started         │
//!                      + initials   initials posted            │ every process
//!                      + defaults   defaults fired             │ inactive 50 ms
//!                                                              ▼
//!                                         stop() ◄──────── end emitted
//! ```
//!
//! # Locking
//!
//! Three tiers, acquired strictly in this order and never in reverse:
//! component locks (async), socket locks, then the coordinator's shared
//! state. Observer callbacks run under a socket or component lock and may
//! take the shared lock; coordinator code releases the shared lock before
//! touching any socket or component.

use crate::error::{NetworkError, PortDirection};
use crate::hub::EventHub;
use crate::options::NetworkOptions;
use crate::process::{ProcessRecord, ProcessTable};
use crate::quiescence::QuiescenceState;
use crate::state::RunState;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use weir_component::{
    spawn_driver, Component, ComponentEventSubscriber, ComponentHandle, ComponentLoader, Socket,
    SocketRef, SocketSubscriber,
};
use weir_event::{ComponentEvent, NetworkEvent, Packet, SocketEvent};
use weir_graph::{Graph, GraphEdge, GraphInitializer, GraphNode};
use weir_types::Endpoint;

/// An initial packet waiting to be sent.
#[derive(Clone)]
struct InitialRecord {
    socket: SocketRef,
    data: Value,
}

struct Shared {
    state: RunState,
    quiescence: QuiescenceState,
    hub: EventHub,
    sockets: Vec<SocketRef>,
    defaults: Vec<SocketRef>,
    initials: Vec<InitialRecord>,
    next_initials: Vec<InitialRecord>,
    debug: bool,
    options: NetworkOptions,
}

enum InitialFire {
    Queue,
    Send,
    StartAndSend,
}

/// The coordinator: owns the processes and sockets of one graph instance.
pub struct Network {
    graph: Graph,
    loader: Arc<dyn ComponentLoader>,
    processes: ProcessTable,
    shared: Arc<Mutex<Shared>>,
    forwarders: Vec<JoinHandle<()>>,
}

impl Network {
    /// Creates a coordinator for the graph with default options.
    #[must_use]
    pub fn new(graph: Graph, loader: Arc<dyn ComponentLoader>) -> Self {
        Self::with_options(graph, loader, NetworkOptions::default())
    }

    /// Creates a coordinator with explicit options.
    #[must_use]
    pub fn with_options(
        graph: Graph,
        loader: Arc<dyn ComponentLoader>,
        options: NetworkOptions,
    ) -> Self {
        let shared = Shared {
            state: RunState::new(),
            quiescence: QuiescenceState::new(),
            hub: EventHub::new(options.event_capacity),
            sockets: Vec::new(),
            defaults: Vec::new(),
            initials: Vec::new(),
            next_initials: Vec::new(),
            debug: options.debug,
            options,
        };
        Self {
            graph,
            loader,
            processes: ProcessTable::new(),
            shared: Arc::new(Mutex::new(shared)),
            forwarders: Vec::new(),
        }
    }

    /// Returns the graph this network was built from.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Subscribes to the outbound event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.shared.lock().hub.subscribe()
    }

    // ------------------------------------------------------------------
    // Process table
    // ------------------------------------------------------------------

    /// Looks up a process record.
    #[must_use]
    pub fn get_node(&self, id: &str) -> Option<&ProcessRecord> {
        self.processes.get(id)
    }

    /// Returns registered node ids, sorted.
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        self.processes.ids()
    }

    /// Returns the number of registered processes.
    #[must_use]
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Registers a node, loading its component.
    ///
    /// Idempotent by id: registering an already-known id is a no-op and
    /// does not reload the component. A node without a component name
    /// becomes a reserved placeholder.
    ///
    /// # Errors
    ///
    /// Loader failures propagate verbatim.
    pub async fn add_node(&mut self, node: &GraphNode) -> Result<(), NetworkError> {
        if self.processes.contains(&node.id) {
            return Ok(());
        }
        let Some(component_name) = node.component.as_deref() else {
            debug!(node = %node.id, "registering placeholder process");
            self.processes.insert(ProcessRecord::placeholder(&node.id));
            return Ok(());
        };

        debug!(node = %node.id, component = component_name, "loading component");
        let mut instance = self.loader.load(component_name, &node.metadata).await?;
        instance.core_mut().set_node_id(&node.id);
        let mailbox = instance.core_mut().take_mailbox();
        let is_subgraph = instance.is_subgraph();
        let handle: ComponentHandle = Arc::new(tokio::sync::Mutex::new(instance));

        // Subgraph subscription first, so inner provenance is wired before
        // any node-level event can be observed.
        if is_subgraph {
            self.subscribe_subgraph(&node.id, &handle).await;
        }
        self.subscribe_node(&handle).await;

        let driver = mailbox.map(|rx| spawn_driver(Arc::clone(&handle), rx));
        self.processes.insert(ProcessRecord {
            id: node.id.clone(),
            component: Some(handle),
            component_name: Some(component_name.to_string()),
            driver,
        });
        Ok(())
    }

    /// Shuts a process down and removes it.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownNode`] for an unregistered id; a shutdown
    /// failure leaves the record in place.
    pub async fn remove_node(&mut self, id: &str) -> Result<(), NetworkError> {
        let record = self
            .processes
            .get(id)
            .ok_or_else(|| NetworkError::UnknownNode(id.to_string()))?;
        if let Some(handle) = record.component.clone() {
            handle.lock().await.shutdown().await?;
        }
        self.processes.remove(id);
        self.shared.lock().quiescence.forget(id);
        debug!(node = id, "process removed");
        Ok(())
    }

    /// Renames a process, re-stamping its component's node id.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownNode`] if `old` is unregistered,
    /// [`NetworkError::NodeExists`] if `new` is taken.
    pub async fn rename_node(&mut self, old: &str, new: &str) -> Result<(), NetworkError> {
        self.processes.rename(old, new)?;
        if let Some(handle) = self.processes.get(new).and_then(|r| r.component.clone()) {
            handle.lock().await.core_mut().set_node_id(new);
        }
        self.shared.lock().quiescence.rename(old, new);
        debug!(from = old, to = new, "process renamed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attachment engine
    // ------------------------------------------------------------------

    /// Binds one socket end to a port.
    ///
    /// Sets the matching endpoint on the socket, then attaches it to the
    /// named port. Addressable ports keep the endpoint's index; plain
    /// ports have it cleared.
    async fn connect_port(
        &self,
        socket: &SocketRef,
        endpoint: &Endpoint,
        inbound: bool,
    ) -> Result<(), NetworkError> {
        if inbound {
            socket.lock().set_to(endpoint.clone());
        } else {
            socket.lock().set_from(endpoint.clone());
        }

        let handle = self.component_handle(&endpoint.process)?;
        let mut component = handle.lock().await;
        if inbound {
            let core = component.core_mut();
            let Some(port) = core.in_ports_mut().get_mut(&endpoint.port) else {
                return Err(NetworkError::NoSuchPort {
                    direction: PortDirection::Inbound,
                    port: endpoint.port.clone(),
                    process: endpoint.process.clone(),
                });
            };
            if !port.is_addressable() && endpoint.index.is_some() {
                socket.lock().set_to(endpoint.without_index());
            }
            port.attach(socket);
        } else {
            let core = component.core_mut();
            let Some(port) = core.out_ports_mut().get_mut(&endpoint.port) else {
                return Err(NetworkError::NoSuchPort {
                    direction: PortDirection::Outbound,
                    port: endpoint.port.clone(),
                    process: endpoint.process.clone(),
                });
            };
            if !port.is_addressable() && endpoint.index.is_some() {
                socket.lock().set_from(endpoint.without_index());
            }
            port.attach(socket);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Edge / initial / default builders
    // ------------------------------------------------------------------

    /// Wires an edge: creates a socket, waits for both components to be
    /// ready, subscribes, and attaches inbound first so a synchronous
    /// delivery from the outbound side always has a destination.
    ///
    /// # Errors
    ///
    /// Unknown nodes, placeholder processes, and missing ports; on error
    /// the socket is not added to the registry.
    pub async fn add_edge(&mut self, edge: &GraphEdge) -> Result<(), NetworkError> {
        let socket = Socket::shared(edge.metadata.clone());
        let to_handle = self.component_handle(&edge.to.process)?;
        let from_handle = self.component_handle(&edge.from.process)?;
        Self::wait_ready(&to_handle).await;
        Self::wait_ready(&from_handle).await;

        let legacy_source = if from_handle.lock().await.is_legacy() {
            Some(edge.from.process.clone())
        } else {
            None
        };
        self.subscribe_socket(&socket, legacy_source);

        self.connect_port(&socket, &edge.to, true).await?;
        self.connect_port(&socket, &edge.from, false).await?;

        debug!(socket = %socket.lock().label(), "edge wired");
        self.shared.lock().sockets.push(socket);
        Ok(())
    }

    /// Removes the sockets whose receiving end matches the edge's inbound
    /// side, detaching them from both ports.
    ///
    /// # Errors
    ///
    /// None currently; unknown endpoints simply match nothing.
    pub async fn remove_edge(&mut self, edge: &GraphEdge) -> Result<(), NetworkError> {
        let victims = self.take_sockets_to(&edge.to, false);
        for socket in victims {
            self.detach_both_ends(&socket).await;
        }
        Ok(())
    }

    /// Wires an initial packet: creates a socket attached only on the
    /// inbound side and records the value for the next `start`.
    ///
    /// If the network is running the packet is sent immediately; if the
    /// network has ended but was never stopped, it is revived (marked
    /// started) and the packet is sent.
    ///
    /// # Errors
    ///
    /// Unknown nodes, placeholder processes, and missing ports.
    pub async fn add_initial(&mut self, initializer: &GraphInitializer) -> Result<(), NetworkError> {
        let socket = Socket::shared(initializer.metadata.clone());
        let handle = self.component_handle(&initializer.to.process)?;
        Self::wait_ready(&handle).await;
        self.subscribe_socket(&socket, None);
        self.connect_port(&socket, &initializer.to, true).await?;

        let fire = {
            let mut guard = self.shared.lock();
            guard.sockets.push(socket.clone());
            guard.initials.push(InitialRecord {
                socket: socket.clone(),
                data: initializer.data.clone(),
            });
            guard.next_initials.push(InitialRecord {
                socket,
                data: initializer.data.clone(),
            });
            if guard.quiescence.is_running() {
                InitialFire::Send
            } else if !guard.state.is_stopped() {
                InitialFire::StartAndSend
            } else {
                InitialFire::Queue
            }
        };

        match fire {
            InitialFire::Queue => {}
            InitialFire::Send => self.send_initials().await,
            InitialFire::StartAndSend => {
                Self::announce_started(&mut self.shared.lock());
                self.send_initials().await;
            }
        }
        Ok(())
    }

    /// Removes the initial-packet socket bound to the given inport, along
    /// with its queued records.
    ///
    /// # Errors
    ///
    /// None currently; unknown endpoints simply match nothing.
    pub async fn remove_initial(&mut self, to: &Endpoint) -> Result<(), NetworkError> {
        let victims = self.take_sockets_to(to, true);
        for socket in victims {
            self.detach_both_ends(&socket).await;
        }
        Ok(())
    }

    /// Creates default-value carriers for every inport of the process that
    /// declares a default and has nothing attached yet.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownNode`] for an unregistered id. Placeholder
    /// processes are skipped silently.
    pub async fn add_defaults(&mut self, node: &str) -> Result<(), NetworkError> {
        let record = self
            .processes
            .get(node)
            .ok_or_else(|| NetworkError::UnknownNode(node.to_string()))?;
        let Some(handle) = record.component.clone() else {
            return Ok(());
        };
        Self::wait_ready(&handle).await;

        let ports: Vec<String> = {
            let component = handle.lock().await;
            component
                .core()
                .in_ports()
                .iter()
                .filter(|port| port.has_default() && !port.is_attached())
                .map(|port| port.name().to_string())
                .collect()
        };

        for port in ports {
            let socket = Socket::shared(Value::Null);
            self.subscribe_socket(&socket, None);
            self.connect_port(&socket, &Endpoint::new(node, port), true)
                .await?;
            let mut guard = self.shared.lock();
            guard.sockets.push(socket.clone());
            guard.defaults.push(socket);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Graph connector
    // ------------------------------------------------------------------

    /// Instantiates the graph in four strictly ordered phases: nodes,
    /// edges, initial packets, defaults. Elements are processed
    /// sequentially; every `connect_yield_interval`-th element of a phase
    /// yields to the scheduler.
    ///
    /// # Errors
    ///
    /// The first failing element aborts the whole connect.
    pub async fn connect(&mut self) -> Result<(), NetworkError> {
        info!(graph = %self.graph.name, "connecting network");
        let graph = self.graph.clone();

        for (i, node) in graph.nodes.iter().enumerate() {
            self.yield_point(i).await;
            self.add_node(node).await?;
        }
        for (i, edge) in graph.edges.iter().enumerate() {
            self.yield_point(i).await;
            self.add_edge(edge).await?;
        }
        for (i, initializer) in graph.initializers.iter().enumerate() {
            self.yield_point(i).await;
            self.add_initial(initializer).await?;
        }
        for (i, node) in graph.nodes.iter().enumerate() {
            self.yield_point(i).await;
            self.add_defaults(&node.id).await?;
        }
        info!(
            graph = %self.graph.name,
            processes = self.processes.len(),
            sockets = self.socket_count(),
            "network connected"
        );
        Ok(())
    }

    async fn yield_point(&self, index: usize) {
        let interval = self.shared.lock().options.connect_yield_interval;
        if interval > 0 && index > 0 && index % interval == 0 {
            tokio::task::yield_now().await;
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Starts the network: components first, then initial packets, then
    /// defaults, then the `start` transition (which flushes the event
    /// buffer). Starting a started network restarts it.
    ///
    /// # Errors
    ///
    /// Component start failures propagate and abort the start.
    pub async fn start(&mut self) -> Result<(), NetworkError> {
        if self.is_started() {
            // Restart semantics: a full stop, then fall through to start.
            self.stop().await?;
        }
        info!(graph = %self.graph.name, "starting network");
        {
            let mut guard = self.shared.lock();
            guard.initials = guard.next_initials.clone();
            guard.hub.clear_buffer();
        }
        self.start_components().await?;
        self.send_initials().await;
        self.send_defaults().await;
        Self::announce_started(&mut self.shared.lock());
        Ok(())
    }

    /// Stops the network: disconnects every connected socket, shuts down
    /// every started component, then transitions to stopped (emitting
    /// `end` if the network was started).
    ///
    /// # Errors
    ///
    /// Component shutdown failures propagate; the network stays partially
    /// stopped.
    pub async fn stop(&mut self) -> Result<(), NetworkError> {
        info!(graph = %self.graph.name, "stopping network");
        let sockets = self.shared.lock().sockets.clone();
        for socket in sockets {
            let mut guard = socket.lock();
            if guard.is_connected() {
                guard.disconnect();
            }
        }

        for id in self.processes.ids() {
            let Some(handle) = self.processes.get(&id).and_then(|r| r.component.clone()) else {
                continue;
            };
            let mut component = handle.lock().await;
            if !component.core().is_started() {
                continue;
            }
            debug!(node = %id, "shutting component down");
            component.shutdown().await?;
        }

        let mut guard = self.shared.lock();
        let payload = guard.state.set_ended();
        guard.state.set_stopped_flag();
        if let Some((start, end, uptime)) = payload {
            info!(?uptime, "network stopped");
            guard.hub.emit(NetworkEvent::End { start, end, uptime }, false);
        }
        Ok(())
    }

    /// Enables or disables per-packet tracing on every socket, recursing
    /// into subgraphs.
    pub async fn set_debug(&mut self, active: bool) {
        let sockets = {
            let mut guard = self.shared.lock();
            guard.debug = active;
            guard.sockets.clone()
        };
        for socket in sockets {
            socket.lock().set_debug(active);
        }
        for id in self.processes.ids() {
            let Some(handle) = self.processes.get(&id).and_then(|r| r.component.clone()) else {
                continue;
            };
            let mut component = handle.lock().await;
            if let Some(link) = component.as_subgraph() {
                link.set_debug(active).await;
            }
        }
    }

    async fn start_components(&mut self) -> Result<(), NetworkError> {
        for id in self.processes.ids() {
            let Some(handle) = self.processes.get(&id).and_then(|r| r.component.clone()) else {
                continue;
            };
            let mut component = handle.lock().await;
            if component.core().is_started() {
                continue;
            }
            debug!(node = %id, "starting component");
            component.start().await?;
        }
        Ok(())
    }

    /// Posts every queued initial packet, tagged `initial`, and drains the
    /// queue. Deferred one scheduler turn so subscribers can attach.
    async fn send_initials(&mut self) {
        tokio::task::yield_now().await;
        let batch = std::mem::take(&mut self.shared.lock().initials);
        for record in batch {
            let mut socket = record.socket.lock();
            debug!(socket = %socket.label(), "sending initial packet");
            socket.post(Packet::initial(record.data));
        }
    }

    /// Fires every default carrier whose target port has no other socket.
    /// A port with more than one attachment (the default carrier plus
    /// anything else) already received traffic wiring and is skipped.
    async fn send_defaults(&mut self) {
        let defaults = self.shared.lock().defaults.clone();
        for socket in defaults {
            let Some(to) = socket.lock().to().cloned() else {
                continue;
            };
            let Ok(handle) = self.component_handle(&to.process) else {
                continue;
            };
            let default = {
                let component = handle.lock().await;
                let Some(port) = component.core().in_ports().get(&to.port) else {
                    continue;
                };
                if port.attached_count() > 1 {
                    warn!(port = %to, "skipping default, port already wired");
                    continue;
                }
                port.default_value().cloned()
            };
            let Some(value) = default else { continue };
            let mut guard = socket.lock();
            debug!(socket = %guard.label(), "sending default value");
            guard.send(value);
            guard.disconnect();
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Returns `true` while the network is started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.shared.lock().state.is_started()
    }

    /// Returns `true` after an explicit stop (and before the first start).
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.lock().state.is_stopped()
    }

    /// Returns `true` while any process is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.lock().quiescence.is_running()
    }

    /// Returns the ids of currently active processes.
    #[must_use]
    pub fn active_processes(&self) -> Vec<String> {
        self.shared.lock().quiescence.active_processes()
    }

    /// Time spent started; zero while not started.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.shared.lock().state.uptime()
    }

    /// Number of live sockets (edges, initial carriers, defaults).
    #[must_use]
    pub fn socket_count(&self) -> usize {
        self.shared.lock().sockets.len()
    }

    // ------------------------------------------------------------------
    // Event multiplexing
    // ------------------------------------------------------------------

    fn subscribe_socket(&self, socket: &SocketRef, legacy_source: Option<String>) {
        // Sockets live inside the shared state; observers must hold a
        // non-owning reference or the network could never be freed.
        let weak = Arc::downgrade(&self.shared);
        let subscriber: SocketSubscriber = Arc::new(move |context, event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut guard = shared.lock();
            match event {
                SocketEvent::Ip(packet) => {
                    let started = guard.state.is_started();
                    guard.hub.emit(
                        NetworkEvent::Ip {
                            socket: context.id,
                            from: context.from.clone(),
                            to: context.to.clone(),
                            packet: packet.clone(),
                        },
                        started,
                    );
                }
                SocketEvent::Connect => {
                    if let Some(node) = &legacy_source {
                        guard.quiescence.connection_opened(node);
                    }
                    let started = guard.state.is_started();
                    guard
                        .hub
                        .emit(NetworkEvent::Connect { socket: context.id }, started);
                }
                SocketEvent::Disconnect => {
                    if let Some(node) = &legacy_source {
                        if guard.quiescence.connection_closed(node) == 0 {
                            Self::check_if_finished(&shared, &mut guard);
                        }
                    }
                    let started = guard.state.is_started();
                    guard
                        .hub
                        .emit(NetworkEvent::Disconnect { socket: context.id }, started);
                }
                SocketEvent::Error(message) => {
                    let process = context
                        .from
                        .as_ref()
                        .or(context.to.as_ref())
                        .map(|endpoint| endpoint.process.clone())
                        .unwrap_or_default();
                    let started = guard.state.is_started();
                    guard.hub.emit(
                        NetworkEvent::ProcessError {
                            process,
                            error: message.clone(),
                            subgraph: Vec::new(),
                        },
                        started,
                    );
                }
            }
        });
        socket.lock().subscribe(subscriber);

        let debug = self.shared.lock().debug;
        if debug {
            socket.lock().set_debug(true);
        }
    }

    async fn subscribe_node(&self, handle: &ComponentHandle) {
        let weak = Arc::downgrade(&self.shared);
        let subscriber: ComponentEventSubscriber = Arc::new(move |node, event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut guard = shared.lock();
            match event {
                ComponentEvent::Activate { load } => {
                    guard.quiescence.record_load(node, *load);
                    // Any activation aborts a pending debounced end.
                    guard.quiescence.request_abort();
                }
                ComponentEvent::Deactivate { load } => {
                    guard.quiescence.record_load(node, *load);
                    if *load == 0 {
                        Self::check_if_finished(&shared, &mut guard);
                    }
                }
                ComponentEvent::Icon(icon) => {
                    let started = guard.state.is_started();
                    guard.hub.emit(
                        NetworkEvent::Icon {
                            process: node.to_string(),
                            icon: icon.clone(),
                        },
                        started,
                    );
                }
                ComponentEvent::Error(message) => {
                    let started = guard.state.is_started();
                    guard.hub.emit(
                        NetworkEvent::ProcessError {
                            process: node.to_string(),
                            error: message.clone(),
                            subgraph: Vec::new(),
                        },
                        started,
                    );
                }
                ComponentEvent::Ready => {}
            }
        });
        handle.lock().await.core_mut().subscribe(subscriber);
    }

    /// Forwards a subgraph's `ip` and `process-error` events with the
    /// parent node id prepended to their provenance, and pushes debug mode
    /// down.
    async fn subscribe_subgraph(&mut self, node_id: &str, handle: &ComponentHandle) {
        Self::wait_ready(handle).await;
        let debug = self.shared.lock().debug;
        let mut events = {
            let mut component = handle.lock().await;
            let Some(link) = component.as_subgraph() else {
                return;
            };
            link.set_debug(debug).await;
            link.events()
        };

        let weak = Arc::downgrade(&self.shared);
        let node = node_id.to_string();
        let forwarder = tokio::spawn(async move {
            loop {
                let forwarded = match events.recv().await {
                    Ok(NetworkEvent::Ip {
                        socket,
                        from,
                        to,
                        mut packet,
                    }) => {
                        packet.subgraph.insert(0, node.clone());
                        NetworkEvent::Ip {
                            socket,
                            from,
                            to,
                            packet,
                        }
                    }
                    Ok(NetworkEvent::ProcessError {
                        process,
                        error,
                        mut subgraph,
                    }) => {
                        subgraph.insert(0, node.clone());
                        NetworkEvent::ProcessError {
                            process,
                            error,
                            subgraph,
                        }
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "subgraph event stream lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let mut guard = shared.lock();
                let started = guard.state.is_started();
                guard.hub.emit(forwarded, started);
            }
        });
        self.forwarders.push(forwarder);
    }

    // ------------------------------------------------------------------
    // Quiescence
    // ------------------------------------------------------------------

    /// Called on every deactivation edge. If nothing is active, arms a
    /// debounce window; the timer re-checks and ends the network unless an
    /// activation aborted it or a newer window superseded it.
    fn check_if_finished(shared: &Arc<Mutex<Shared>>, guard: &mut Shared) {
        if guard.quiescence.is_running() {
            return;
        }
        let generation = guard.quiescence.arm();
        let delay = guard.options.debounce();
        let weak = Arc::downgrade(shared);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut guard = shared.lock();
            if guard.quiescence.generation() != generation
                || guard.quiescence.abort_requested()
                || guard.quiescence.is_running()
                || !guard.state.is_started()
            {
                return;
            }
            if let Some((start, end, uptime)) = guard.state.set_ended() {
                info!(?uptime, "network went quiescent");
                guard.hub.emit(NetworkEvent::End { start, end, uptime }, false);
            }
        });
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn announce_started(guard: &mut Shared) {
        if let Some(start) = guard.state.set_started() {
            info!("network started");
            guard.hub.emit(NetworkEvent::Start { start }, true);
        }
    }

    fn component_handle(&self, process: &str) -> Result<ComponentHandle, NetworkError> {
        let record = self
            .processes
            .get(process)
            .ok_or_else(|| NetworkError::UnknownNode(process.to_string()))?;
        record
            .component
            .clone()
            .ok_or_else(|| NetworkError::NoComponent(process.to_string()))
    }

    async fn wait_ready(handle: &ComponentHandle) {
        let mut watch = handle.lock().await.core().ready_watch();
        if *watch.borrow() {
            return;
        }
        debug!("waiting for component readiness");
        // The sender lives in the component core, which outlives this wait.
        let _ = watch.wait_for(|ready| *ready).await;
    }

    /// Removes and returns the sockets whose receiving end matches the
    /// endpoint. With `drop_initials`, queued initial records for those
    /// sockets are removed too.
    fn take_sockets_to(&self, to: &Endpoint, drop_initials: bool) -> Vec<SocketRef> {
        let all = self.shared.lock().sockets.clone();
        let victims: Vec<SocketRef> = all
            .into_iter()
            .filter(|socket| {
                let guard = socket.lock();
                guard.to().is_some_and(|bound| {
                    bound.same_port(to) && (to.index.is_none() || bound.index == to.index)
                })
            })
            .collect();
        if victims.is_empty() {
            return victims;
        }

        let mut guard = self.shared.lock();
        guard
            .sockets
            .retain(|socket| !victims.iter().any(|v| Arc::ptr_eq(socket, v)));
        guard
            .defaults
            .retain(|socket| !victims.iter().any(|v| Arc::ptr_eq(socket, v)));
        if drop_initials {
            guard
                .initials
                .retain(|record| !victims.iter().any(|v| Arc::ptr_eq(&record.socket, v)));
            guard
                .next_initials
                .retain(|record| !victims.iter().any(|v| Arc::ptr_eq(&record.socket, v)));
        }
        victims
    }

    async fn detach_both_ends(&self, socket: &SocketRef) {
        let (id, from, to) = {
            let guard = socket.lock();
            (guard.id(), guard.from().cloned(), guard.to().cloned())
        };
        if let Some(to) = to {
            if let Ok(handle) = self.component_handle(&to.process) {
                let mut component = handle.lock().await;
                if let Some(port) = component.core_mut().in_ports_mut().get_mut(&to.port) {
                    port.detach(id);
                }
            }
        }
        if let Some(from) = from {
            if let Ok(handle) = self.component_handle(&from.process) {
                let mut component = handle.lock().await;
                if let Some(port) = component.core_mut().out_ports_mut().get_mut(&from.port) {
                    port.detach(id);
                }
            }
        }
        debug!(socket = %socket.lock().label(), "socket removed");
    }

    /// Wires an externally driven socket onto one of this network's
    /// inports. Used by the subgraph component to feed exported ports.
    pub(crate) async fn wire_external_inport(
        &mut self,
        endpoint: &Endpoint,
    ) -> Result<SocketRef, NetworkError> {
        let socket = Socket::shared(Value::Null);
        let handle = self.component_handle(&endpoint.process)?;
        Self::wait_ready(&handle).await;
        self.subscribe_socket(&socket, None);
        self.connect_port(&socket, endpoint, true).await?;
        self.shared.lock().sockets.push(socket.clone());
        Ok(socket)
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_component::testing::Repeat;
    use weir_component::Registry;

    fn registry() -> Arc<Registry> {
        let mut registry = Registry::new();
        registry.register("Repeat", || Box::new(Repeat::new()));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn placeholder_node_is_registered_without_loading() {
        let mut graph = Graph::new("g");
        graph.add_node("reserved", None);
        let mut network = Network::new(graph, registry());

        network.connect().await.unwrap();
        let record = network.get_node("reserved").unwrap();
        assert!(!record.has_component());
    }

    #[tokio::test]
    async fn edge_to_placeholder_errors() {
        let mut graph = Graph::new("g");
        graph
            .add_node("a", Some("Repeat"))
            .add_node("hole", None)
            .add_edge(("a", "out"), ("hole", "in"));
        let mut network = Network::new(graph, registry());

        let err = network.connect().await.unwrap_err();
        assert_eq!(err, NetworkError::NoComponent("hole".into()));
    }

    #[tokio::test]
    async fn edge_to_unknown_node_errors() {
        let graph = Graph::new("g");
        let mut network = Network::new(graph, registry());

        let edge = GraphEdge {
            from: Endpoint::new("a", "out"),
            to: Endpoint::new("b", "in"),
            metadata: Value::Null,
        };
        let err = network.add_edge(&edge).await.unwrap_err();
        assert_eq!(err, NetworkError::UnknownNode("b".into()));
    }

    #[tokio::test]
    async fn index_is_cleared_on_plain_ports() {
        let mut graph = Graph::new("g");
        graph
            .add_node("a", Some("Repeat"))
            .add_node("b", Some("Repeat"))
            .add_edge(("a", "out", 3_usize), ("b", "in", 7_usize));
        let mut network = Network::new(graph, registry());
        network.connect().await.unwrap();

        let handle = network.component_handle("b").unwrap();
        let component = handle.lock().await;
        let port = component.core().in_ports().get("in").unwrap();
        let socket = &port.sockets()[0];
        assert_eq!(socket.lock().to().unwrap().index, None);
        assert_eq!(socket.lock().from().unwrap().index, None);
    }

    #[tokio::test]
    async fn index_is_kept_on_addressable_ports() {
        let mut registry = Registry::new();
        registry.register("Repeat", || Box::new(Repeat::new()));
        registry.register("Merge", || {
            Box::new(weir_component::testing::Merge::new())
        });

        let mut graph = Graph::new("g");
        graph
            .add_node("a", Some("Repeat"))
            .add_node("m", Some("Merge"))
            .add_edge(("a", "out"), ("m", "in", 2_usize));
        let mut network = Network::new(graph, Arc::new(registry));
        network.connect().await.unwrap();

        let handle = network.component_handle("m").unwrap();
        let component = handle.lock().await;
        let port = component.core().in_ports().get("in").unwrap();
        let socket = &port.sockets()[0];
        assert_eq!(socket.lock().to().unwrap().index, Some(2));
    }

    #[tokio::test]
    async fn rename_restamps_component_node_id() {
        let mut graph = Graph::new("g");
        graph.add_node("before", Some("Repeat"));
        let mut network = Network::new(graph, registry());
        network.connect().await.unwrap();

        network.rename_node("before", "after").await.unwrap();
        let handle = network.component_handle("after").unwrap();
        assert_eq!(handle.lock().await.core().node_id(), "after");
        assert!(network.get_node("before").is_none());
    }

    #[tokio::test]
    async fn remove_node_forgets_process() {
        let mut graph = Graph::new("g");
        graph.add_node("a", Some("Repeat"));
        let mut network = Network::new(graph, registry());
        network.connect().await.unwrap();

        network.remove_node("a").await.unwrap();
        assert!(network.get_node("a").is_none());
        assert_eq!(
            network.remove_node("a").await.unwrap_err(),
            NetworkError::UnknownNode("a".into())
        );
    }
}
