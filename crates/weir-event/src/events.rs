//! Event types exchanged between sockets, components, and the coordinator.
//!
//! Three audiences, three enums:
//!
//! - [`SocketEvent`] - what a socket tells its observers (the coordinator).
//! - [`ComponentEvent`] - what a component core tells its observers
//!   (activation accounting, readiness, icon changes, failures).
//! - [`NetworkEvent`] - what the coordinator tells the outside world.
//!
//! [`Delivery`] is not an event: it is the unit of transport a socket pushes
//! into an inport mailbox for the owning component to consume.

use crate::{Packet, PacketKind};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use weir_types::{Endpoint, SocketId};

/// A packet addressed to a specific inport, queued for its component.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Target inport name.
    pub port: String,
    /// Slot within an addressable inport, if any.
    pub index: Option<usize>,
    /// The packet itself.
    pub packet: Packet,
}

/// Transport-level event emitted by a socket to its observers.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// A packet traversed the socket.
    Ip(Packet),
    /// The socket transitioned to connected.
    Connect,
    /// The socket transitioned to disconnected.
    Disconnect,
    /// Transport failure reported by the writing end.
    Error(String),
}

/// Lifecycle event emitted by a component core to its observers.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentEvent {
    /// The component finished initializing and can accept attachments.
    Ready,
    /// The component began a unit of work; `load` is the new in-flight count.
    Activate {
        /// In-flight work count after the activation.
        load: usize,
    },
    /// The component finished a unit of work; `load` is the remaining count.
    Deactivate {
        /// In-flight work count after the deactivation.
        load: usize,
    },
    /// The component changed its icon.
    Icon(String),
    /// The component failed while processing.
    Error(String),
}

/// Event on the coordinator's outbound stream.
///
/// # Buffering
///
/// While a network has not yet started, most events are held in an ordered
/// buffer and replayed immediately after [`NetworkEvent::Start`]. Events for
/// which [`bypasses_buffer`](NetworkEvent::bypasses_buffer) returns `true`
/// are delivered immediately regardless of state - errors and terminal
/// events must never sit in a buffer nobody is flushing.
///
/// # Legacy kinds
///
/// `Data`, `BeginGroup`, and `EndGroup` are synthesized from `Ip` events for
/// consumers written against the older connection-oriented surface; see
/// [`legacy_synthesis`](NetworkEvent::legacy_synthesis).
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// The network started; payload is the startup timestamp.
    Start {
        /// Wall-clock time the network first started.
        start: DateTime<Utc>,
    },
    /// The network stopped or went quiescent.
    End {
        /// Wall-clock time the network started.
        start: DateTime<Utc>,
        /// Wall-clock time the network ended.
        end: DateTime<Utc>,
        /// Monotonic time spent started.
        uptime: Duration,
    },
    /// A packet traversed a socket somewhere in the network.
    Ip {
        /// Carrier socket.
        socket: SocketId,
        /// Writing end, absent for initial-packet and default carriers.
        from: Option<Endpoint>,
        /// Receiving end.
        to: Option<Endpoint>,
        /// The packet, including its subgraph provenance trail.
        packet: Packet,
    },
    /// A process failed at runtime.
    ProcessError {
        /// Offending process id.
        process: String,
        /// Failure description.
        error: String,
        /// Containing subgraph node ids, outermost first.
        subgraph: Vec<String>,
    },
    /// A process changed its icon.
    Icon {
        /// Process id.
        process: String,
        /// New icon name.
        icon: String,
    },
    /// A socket connected (legacy surface).
    Connect {
        /// Carrier socket.
        socket: SocketId,
    },
    /// A socket disconnected (legacy surface).
    Disconnect {
        /// Carrier socket.
        socket: SocketId,
    },
    /// Data packet, synthesized from `Ip` (legacy surface).
    Data {
        /// Carrier socket.
        socket: SocketId,
        /// Packet payload.
        data: Value,
    },
    /// Group opened, synthesized from `Ip` (legacy surface).
    BeginGroup {
        /// Carrier socket.
        socket: SocketId,
        /// Group name.
        group: Value,
    },
    /// Group closed, synthesized from `Ip` (legacy surface).
    EndGroup {
        /// Carrier socket.
        socket: SocketId,
        /// Group name.
        group: Value,
    },
}

impl NetworkEvent {
    /// Returns `true` for events delivered immediately even before start.
    #[must_use]
    pub fn bypasses_buffer(&self) -> bool {
        matches!(
            self,
            Self::Start { .. } | Self::End { .. } | Self::Icon { .. } | Self::ProcessError { .. }
        )
    }

    /// Returns the legacy event derived from an `Ip` event, if any.
    #[must_use]
    pub fn legacy_synthesis(&self) -> Option<NetworkEvent> {
        let Self::Ip { socket, packet, .. } = self else {
            return None;
        };
        Some(match packet.kind {
            PacketKind::Data => Self::Data {
                socket: *socket,
                data: packet.data.clone(),
            },
            PacketKind::OpenBracket => Self::BeginGroup {
                socket: *socket,
                group: packet.data.clone(),
            },
            PacketKind::CloseBracket => Self::EndGroup {
                socket: *socket,
                group: packet.data.clone(),
            },
        })
    }

    /// Returns the event's kind as a short name, for logging and tests.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::End { .. } => "end",
            Self::Ip { .. } => "ip",
            Self::ProcessError { .. } => "process-error",
            Self::Icon { .. } => "icon",
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::Data { .. } => "data",
            Self::BeginGroup { .. } => "begingroup",
            Self::EndGroup { .. } => "endgroup",
        }
    }
}
