//! The component contract and its shared core.
//!
//! A component implements [`Component`]: packet handling plus lifecycle.
//! Everything every component needs regardless of behavior - ports,
//! readiness, activation accounting, the mailbox, event fan-out - lives in
//! [`ComponentCore`], so implementations carry one field and two accessor
//! methods instead of re-deriving the plumbing.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use weir_component::{Component, ComponentCore, ComponentError};
//! use weir_event::Delivery;
//!
//! struct Upper {
//!     core: ComponentCore,
//! }
//!
//! impl Upper {
//!     fn new() -> Self {
//!         Self {
//!             core: ComponentCore::builder()
//!                 .inport("in")
//!                 .outport("out")
//!                 .finish(),
//!         }
//!     }
//! }
//!
//! #[async_trait]
//! impl Component for Upper {
//!     fn core(&self) -> &ComponentCore {
//!         &self.core
//!     }
//!
//!     fn core_mut(&mut self) -> &mut ComponentCore {
//!         &mut self.core
//!     }
//!
//!     async fn on_packet(&mut self, delivery: Delivery) -> Result<(), ComponentError> {
//!         let mut packet = delivery.packet;
//!         if let Some(s) = packet.data.as_str() {
//!             packet.data = s.to_uppercase().into();
//!         }
//!         if let Some(out) = self.core.out_ports().get("out") {
//!             out.send(packet)?;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::ComponentError;
use crate::ports::{InPort, InPorts, OutPort, OutPorts};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::{broadcast, watch};
use weir_event::{ComponentEvent, Delivery, NetworkEvent};

/// Shared handle to a loaded component instance.
pub type ComponentHandle = Arc<tokio::sync::Mutex<Box<dyn Component>>>;

/// Observer callback for component lifecycle events.
///
/// The first argument is the component's current node id, so observers
/// survive renames without capturing stale identifiers.
pub type ComponentEventSubscriber = Arc<dyn Fn(&str, &ComponentEvent) + Send + Sync>;

/// The unit of computation in a flow-based program.
///
/// Implementations are passive: they react to deliveries and to lifecycle
/// calls, and a driver task (see [`spawn_driver`](crate::spawn_driver))
/// supplies the motion. All shared plumbing is reached through
/// [`core`](Self::core)/[`core_mut`](Self::core_mut).
#[async_trait]
pub trait Component: Send {
    /// Returns the component's shared core.
    fn core(&self) -> &ComponentCore;

    /// Returns the component's shared core, mutably.
    fn core_mut(&mut self) -> &mut ComponentCore;

    /// Handles one packet delivered to an inport.
    ///
    /// # Errors
    ///
    /// Failures are reported to node observers as
    /// [`ComponentEvent::Error`] by the driver; they do not stop the
    /// process.
    async fn on_packet(&mut self, delivery: Delivery) -> Result<(), ComponentError>;

    /// Starts the component. Idempotence is the caller's concern; the
    /// coordinator skips components that already report started.
    async fn start(&mut self) -> Result<(), ComponentError> {
        self.core_mut().mark_started();
        Ok(())
    }

    /// Shuts the component down.
    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        self.core_mut().mark_stopped();
        Ok(())
    }

    /// Returns `true` if this component embeds a nested network.
    fn is_subgraph(&self) -> bool {
        false
    }

    /// Returns the subgraph capability, when [`is_subgraph`](Self::is_subgraph)
    /// is `true`.
    fn as_subgraph(&mut self) -> Option<&mut dyn SubgraphLink> {
        None
    }

    /// Returns `true` for components using connection-oriented activation
    /// accounting (socket connect/disconnect) instead of load reporting.
    fn is_legacy(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn Component").finish_non_exhaustive()
    }
}

/// Capability of components that embed a nested network.
///
/// Lets the parent coordinator observe the inner network's events and push
/// debug mode down through arbitrarily deep nesting.
#[async_trait]
pub trait SubgraphLink: Send {
    /// Subscribes to the inner network's event stream.
    fn events(&self) -> broadcast::Receiver<NetworkEvent>;

    /// Propagates debug mode into the inner network.
    async fn set_debug(&mut self, active: bool);
}

/// Out-of-band readiness trigger.
///
/// Handed out by [`ComponentCore::readiness_handle`] so external code (a
/// loader finishing asynchronous setup, a test) can flip a component to
/// ready without holding the component lock.
#[derive(Clone)]
pub struct ReadinessHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadinessHandle {
    /// Marks the component ready, waking anyone waiting on it.
    pub fn set_ready(&self) {
        self.tx.send_replace(true);
    }
}

/// Shared state and plumbing embedded in every component.
pub struct ComponentCore {
    node_id: String,
    in_ports: InPorts,
    out_ports: OutPorts,
    ready_tx: Arc<watch::Sender<bool>>,
    ready_rx: watch::Receiver<bool>,
    started: bool,
    load: usize,
    icon: Option<String>,
    mailbox_rx: Option<UnboundedReceiver<Delivery>>,
    subscribers: Vec<ComponentEventSubscriber>,
}

impl ComponentCore {
    /// Starts building a core.
    #[must_use]
    pub fn builder() -> CoreBuilder {
        CoreBuilder::default()
    }

    /// Returns the node id this instance is bound to.
    ///
    /// Empty until the coordinator registers the instance.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Binds (or re-binds, on rename) the instance to a node id.
    pub fn set_node_id(&mut self, id: impl Into<String>) {
        self.node_id = id.into();
    }

    /// Returns the inports.
    #[must_use]
    pub fn in_ports(&self) -> &InPorts {
        &self.in_ports
    }

    /// Returns the inports, mutably.
    pub fn in_ports_mut(&mut self) -> &mut InPorts {
        &mut self.in_ports
    }

    /// Returns the outports.
    #[must_use]
    pub fn out_ports(&self) -> &OutPorts {
        &self.out_ports
    }

    /// Returns the outports, mutably.
    pub fn out_ports_mut(&mut self) -> &mut OutPorts {
        &mut self.out_ports
    }

    /// Returns `true` once the component can accept attachments.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Returns a watch on readiness; `wait_for(|r| *r)` blocks until ready.
    #[must_use]
    pub fn ready_watch(&self) -> watch::Receiver<bool> {
        self.ready_rx.clone()
    }

    /// Returns a cloneable out-of-band readiness trigger.
    #[must_use]
    pub fn readiness_handle(&self) -> ReadinessHandle {
        ReadinessHandle {
            tx: Arc::clone(&self.ready_tx),
        }
    }

    /// Flips readiness, announcing `Ready` to observers on the rising edge.
    pub fn set_ready(&mut self, ready: bool) {
        let was = *self.ready_rx.borrow();
        self.ready_tx.send_replace(ready);
        if ready && !was {
            self.notify(&ComponentEvent::Ready);
        }
    }

    /// Returns `true` while the component is started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Records the started state.
    pub fn mark_started(&mut self) {
        self.started = true;
    }

    /// Records the stopped state.
    pub fn mark_stopped(&mut self) {
        self.started = false;
    }

    /// Returns the in-flight work count.
    #[must_use]
    pub fn load(&self) -> usize {
        self.load
    }

    /// Begins a unit of work.
    pub fn activate(&mut self) {
        self.load += 1;
        self.notify(&ComponentEvent::Activate { load: self.load });
    }

    /// Finishes a unit of work.
    pub fn deactivate(&mut self) {
        self.load = self.load.saturating_sub(1);
        self.notify(&ComponentEvent::Deactivate { load: self.load });
    }

    /// Returns the current icon, if any.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Changes the icon, announcing it to observers.
    pub fn set_icon(&mut self, icon: impl Into<String>) {
        let icon = icon.into();
        self.icon = Some(icon.clone());
        self.notify(&ComponentEvent::Icon(icon));
    }

    /// Reports a processing failure to observers.
    pub fn emit_error(&mut self, message: impl Into<String>) {
        self.notify(&ComponentEvent::Error(message.into()));
    }

    /// Registers a lifecycle observer.
    pub fn subscribe(&mut self, subscriber: ComponentEventSubscriber) {
        self.subscribers.push(subscriber);
    }

    /// Takes the mailbox receiver for the driver to own.
    ///
    /// Returns `None` on every call after the first.
    pub fn take_mailbox(&mut self) -> Option<UnboundedReceiver<Delivery>> {
        self.mailbox_rx.take()
    }

    fn notify(&self, event: &ComponentEvent) {
        for subscriber in &self.subscribers {
            subscriber(&self.node_id, event);
        }
    }
}

/// Builder for [`ComponentCore`].
#[derive(Default)]
pub struct CoreBuilder {
    inports: Vec<(String, bool, Option<Value>)>,
    outports: Vec<(String, bool)>,
    not_ready: bool,
    icon: Option<String>,
}

impl CoreBuilder {
    /// Declares a plain inport.
    #[must_use]
    pub fn inport(mut self, name: impl Into<String>) -> Self {
        self.inports.push((name.into(), false, None));
        self
    }

    /// Declares a plain inport with a default value, injected by the
    /// coordinator at start when nothing else is attached.
    #[must_use]
    pub fn inport_with_default(mut self, name: impl Into<String>, default: Value) -> Self {
        self.inports.push((name.into(), false, Some(default)));
        self
    }

    /// Declares an addressable (array-valued) inport.
    #[must_use]
    pub fn addressable_inport(mut self, name: impl Into<String>) -> Self {
        self.inports.push((name.into(), true, None));
        self
    }

    /// Declares a plain outport.
    #[must_use]
    pub fn outport(mut self, name: impl Into<String>) -> Self {
        self.outports.push((name.into(), false));
        self
    }

    /// Declares an addressable (array-valued) outport.
    #[must_use]
    pub fn addressable_outport(mut self, name: impl Into<String>) -> Self {
        self.outports.push((name.into(), true));
        self
    }

    /// Starts the component not-ready; someone must flip it via
    /// [`ComponentCore::set_ready`] or a [`ReadinessHandle`].
    #[must_use]
    pub fn not_ready(mut self) -> Self {
        self.not_ready = true;
        self
    }

    /// Sets the initial icon.
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Builds the core.
    #[must_use]
    pub fn finish(self) -> ComponentCore {
        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = watch::channel(!self.not_ready);

        let mut in_ports = InPorts::default();
        for (name, addressable, default) in self.inports {
            in_ports.insert(InPort::new(name, addressable, default, mailbox_tx.clone()));
        }
        let mut out_ports = OutPorts::default();
        for (name, addressable) in self.outports {
            out_ports.insert(OutPort::new(name, addressable));
        }

        ComponentCore {
            node_id: String::new(),
            in_ports,
            out_ports,
            ready_tx: Arc::new(ready_tx),
            ready_rx,
            started: false,
            load: 0,
            icon: self.icon,
            mailbox_rx: Some(mailbox_rx),
            subscribers: Vec::new(),
        }
    }
}
