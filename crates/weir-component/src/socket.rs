//! Sockets: ordered point-to-point packet carriers.
//!
//! A socket has a writing end (`from`) and a receiving end (`to`). Packets
//! posted on it are (1) announced synchronously, in call order, to every
//! subscribed observer and (2) queued into the receiving inport's mailbox
//! for the owning component to consume. The coordinator is an observer;
//! the component is the consumer.
//!
//! Endpoints are optional because some carriers have no writing process:
//! initial-packet sockets and default-value sockets dangle on the `from`
//! side, and a freshly created edge socket has neither end until the
//! attachment engine binds them.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use weir_event::{Delivery, Packet, SocketEvent};
use weir_types::{Endpoint, SocketId};

/// Shared handle to a socket.
pub type SocketRef = Arc<Mutex<Socket>>;

/// Observer callback invoked synchronously for every socket event.
///
/// The context is a snapshot; observers must not lock the socket itself.
pub type SocketSubscriber = Arc<dyn Fn(&SocketContext, &SocketEvent) + Send + Sync>;

/// Snapshot of a socket's identity and endpoints at notification time.
#[derive(Debug, Clone)]
pub struct SocketContext {
    /// Socket identity.
    pub id: SocketId,
    /// Writing end, if bound.
    pub from: Option<Endpoint>,
    /// Receiving end, if bound.
    pub to: Option<Endpoint>,
}

/// An ordered point-to-point channel between two ports.
pub struct Socket {
    id: SocketId,
    from: Option<Endpoint>,
    to: Option<Endpoint>,
    metadata: Value,
    connected: bool,
    debug: bool,
    sink: Option<UnboundedSender<Delivery>>,
    subscribers: Vec<SocketSubscriber>,
}

impl Socket {
    /// Creates an unbound socket carrying the given metadata.
    #[must_use]
    pub fn with_metadata(metadata: Value) -> Self {
        Self {
            id: SocketId::new(),
            from: None,
            to: None,
            metadata,
            connected: false,
            debug: false,
            sink: None,
            subscribers: Vec::new(),
        }
    }

    /// Creates an unbound socket wrapped in a shared handle.
    #[must_use]
    pub fn shared(metadata: Value) -> SocketRef {
        Arc::new(Mutex::new(Self::with_metadata(metadata)))
    }

    /// Returns the socket's identity.
    #[must_use]
    pub fn id(&self) -> SocketId {
        self.id
    }

    /// Returns the writing end, if bound.
    #[must_use]
    pub fn from(&self) -> Option<&Endpoint> {
        self.from.as_ref()
    }

    /// Returns the receiving end, if bound.
    #[must_use]
    pub fn to(&self) -> Option<&Endpoint> {
        self.to.as_ref()
    }

    /// Returns the metadata the socket was created with.
    #[must_use]
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Binds the writing end.
    pub fn set_from(&mut self, endpoint: Endpoint) {
        self.from = Some(endpoint);
    }

    /// Binds the receiving end.
    pub fn set_to(&mut self, endpoint: Endpoint) {
        self.to = Some(endpoint);
    }

    /// Registers an observer. Observers are notified in registration order.
    pub fn subscribe(&mut self, subscriber: SocketSubscriber) {
        self.subscribers.push(subscriber);
    }

    /// Wires the receiving inport's mailbox. Called by [`InPort::attach`](crate::InPort::attach).
    pub fn set_sink(&mut self, sink: UnboundedSender<Delivery>) {
        self.sink = Some(sink);
    }

    /// Unwires the receiving inport's mailbox.
    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Returns `true` while the socket is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Enables or disables per-packet trace logging.
    pub fn set_debug(&mut self, active: bool) {
        self.debug = active;
    }

    /// Transitions to connected, notifying observers on the edge.
    pub fn connect(&mut self) {
        if !self.connected {
            self.connected = true;
            self.notify(&SocketEvent::Connect);
        }
    }

    /// Transitions to disconnected, notifying observers on the edge.
    pub fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.notify(&SocketEvent::Disconnect);
        }
    }

    /// Sends a packet down the socket.
    ///
    /// Connects first if necessary, announces the packet to observers, and
    /// queues it for the receiving inport if one is attached. A socket with
    /// no receiving end swallows the packet; observers still see it.
    pub fn post(&mut self, packet: Packet) {
        if !self.connected {
            self.connect();
        }
        if self.debug {
            tracing::debug!(socket = %self.label(), kind = %packet.kind, "packet traversing socket");
        }
        self.notify(&SocketEvent::Ip(packet.clone()));
        if let (Some(sink), Some(to)) = (&self.sink, &self.to) {
            // Receiver may already be gone during teardown.
            let _ = sink.send(Delivery {
                port: to.port.clone(),
                index: to.index,
                packet,
            });
        }
    }

    /// Sends a plain data packet. Convenience over [`post`](Self::post).
    pub fn send(&mut self, data: Value) {
        self.post(Packet::data(data));
    }

    /// Reports a transport failure to observers.
    pub fn emit_error(&mut self, message: impl Into<String>) {
        self.notify(&SocketEvent::Error(message.into()));
    }

    /// Human-readable description of the carrier, e.g. `a.OUT -> b.IN`.
    ///
    /// Dangling ends render as `DATA`, which is what an initial-packet
    /// carrier looks like.
    #[must_use]
    pub fn label(&self) -> String {
        let from = self
            .from
            .as_ref()
            .map_or_else(|| "DATA".to_string(), ToString::to_string);
        let to = self
            .to
            .as_ref()
            .map_or_else(|| "DATA".to_string(), ToString::to_string);
        format!("{from} -> {to}")
    }

    fn notify(&self, event: &SocketEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        let context = SocketContext {
            id: self.id,
            from: self.from.clone(),
            to: self.to.clone(),
        };
        for subscriber in &self.subscribers {
            subscriber(&context, event);
        }
    }
}
