//! Inports and outports.
//!
//! Ports are the named attachment points sockets bind to. An *addressable*
//! port is array-valued: each attached socket targets a numbered slot,
//! recorded on the socket's endpoint by the attachment engine.
//!
//! Inports funnel every attached socket into the component's single
//! mailbox; the delivery carries the port name, so one queue serves all
//! ports without losing addressing.

use crate::socket::SocketRef;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use weir_event::{Delivery, Packet};
use weir_types::{ErrorCode, SocketId};

/// A receiving port.
pub struct InPort {
    name: String,
    addressable: bool,
    default: Option<Value>,
    sink: UnboundedSender<Delivery>,
    sockets: Vec<SocketRef>,
}

impl InPort {
    pub(crate) fn new(
        name: impl Into<String>,
        addressable: bool,
        default: Option<Value>,
        sink: UnboundedSender<Delivery>,
    ) -> Self {
        Self {
            name: name.into(),
            addressable,
            default,
            sink,
            sockets: Vec::new(),
        }
    }

    /// Returns the port name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the port is array-valued.
    #[must_use]
    pub fn is_addressable(&self) -> bool {
        self.addressable
    }

    /// Returns `true` if the port declares a default value.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Returns the declared default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns `true` if at least one socket is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.sockets.is_empty()
    }

    /// Returns the number of attached sockets.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.sockets.len()
    }

    /// Attaches a socket, wiring it into the component mailbox.
    ///
    /// Slot addressing lives on the socket's receiving endpoint, set by
    /// whoever bound it there; the port itself only tracks membership.
    pub fn attach(&mut self, socket: &SocketRef) {
        socket.lock().set_sink(self.sink.clone());
        self.sockets.push(SocketRef::clone(socket));
    }

    /// Detaches a socket by id. Returns `true` if it was attached.
    pub fn detach(&mut self, id: SocketId) -> bool {
        let Some(position) = self.sockets.iter().position(|s| s.lock().id() == id) else {
            return false;
        };
        let socket = self.sockets.remove(position);
        socket.lock().clear_sink();
        true
    }

    /// Returns the attached sockets.
    #[must_use]
    pub fn sockets(&self) -> &[SocketRef] {
        &self.sockets
    }
}

/// A sending port.
pub struct OutPort {
    name: String,
    addressable: bool,
    sockets: Vec<SocketRef>,
}

impl OutPort {
    pub(crate) fn new(name: impl Into<String>, addressable: bool) -> Self {
        Self {
            name: name.into(),
            addressable,
            sockets: Vec::new(),
        }
    }

    /// Returns the port name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the port is array-valued.
    #[must_use]
    pub fn is_addressable(&self) -> bool {
        self.addressable
    }

    /// Returns `true` if at least one socket is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.sockets.is_empty()
    }

    /// Returns the number of attached sockets.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.sockets.len()
    }

    /// Attaches a socket.
    pub fn attach(&mut self, socket: &SocketRef) {
        self.sockets.push(SocketRef::clone(socket));
    }

    /// Detaches a socket by id. Returns `true` if it was attached.
    pub fn detach(&mut self, id: SocketId) -> bool {
        let Some(position) = self.sockets.iter().position(|s| s.lock().id() == id) else {
            return false;
        };
        self.sockets.remove(position);
        true
    }

    /// Posts a packet on every attached socket.
    ///
    /// # Errors
    ///
    /// Addressable ports require a slot; use [`send_to`](Self::send_to).
    pub fn send(&self, packet: Packet) -> Result<(), PortError> {
        if self.addressable {
            return Err(PortError::IndexRequired(self.name.clone()));
        }
        for socket in &self.sockets {
            socket.lock().post(packet.clone());
        }
        Ok(())
    }

    /// Posts a packet on the sockets bound to one slot of an addressable port.
    ///
    /// # Errors
    ///
    /// Only addressable ports have slots.
    pub fn send_to(&self, index: usize, packet: Packet) -> Result<(), PortError> {
        if !self.addressable {
            return Err(PortError::NotAddressable(self.name.clone()));
        }
        for socket in &self.sockets {
            let mut guard = socket.lock();
            if guard.from().and_then(|ep| ep.index) == Some(index) {
                guard.post(packet.clone());
            }
        }
        Ok(())
    }

    /// Returns the attached sockets.
    #[must_use]
    pub fn sockets(&self) -> &[SocketRef] {
        &self.sockets
    }
}

/// Named collection of inports.
#[derive(Default)]
pub struct InPorts {
    ports: BTreeMap<String, InPort>,
}

impl InPorts {
    pub(crate) fn insert(&mut self, port: InPort) {
        self.ports.insert(port.name().to_string(), port);
    }

    /// Looks a port up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&InPort> {
        self.ports.get(name)
    }

    /// Looks a port up by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut InPort> {
        self.ports.get_mut(name)
    }

    /// Returns port names in deterministic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ports.keys().map(String::as_str)
    }

    /// Iterates ports in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &InPort> {
        self.ports.values()
    }
}

/// Named collection of outports.
#[derive(Default)]
pub struct OutPorts {
    ports: BTreeMap<String, OutPort>,
}

impl OutPorts {
    pub(crate) fn insert(&mut self, port: OutPort) {
        self.ports.insert(port.name().to_string(), port);
    }

    /// Looks a port up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OutPort> {
        self.ports.get(name)
    }

    /// Looks a port up by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut OutPort> {
        self.ports.get_mut(name)
    }

    /// Returns port names in deterministic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ports.keys().map(String::as_str)
    }

    /// Iterates ports in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &OutPort> {
        self.ports.values()
    }
}

/// Port lookup and addressing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// The named port does not exist.
    #[error("no port named '{0}'")]
    NoSuchPort(String),

    /// A slot index was supplied for a plain port.
    #[error("port '{0}' is not addressable")]
    NotAddressable(String),

    /// An addressable port was used without a slot index.
    #[error("port '{0}' is addressable and requires an index")]
    IndexRequired(String),
}

impl ErrorCode for PortError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoSuchPort(_) => "PORT_NO_SUCH_PORT",
            Self::NotAddressable(_) => "PORT_NOT_ADDRESSABLE",
            Self::IndexRequired(_) => "PORT_INDEX_REQUIRED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
