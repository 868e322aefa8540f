//! Component model for Weir.
//!
//! A component is the unit of computation in a flow-based program: a black
//! box with named inports and outports, driven entirely by the packets that
//! arrive on its inports. This crate defines the contract the network
//! coordinator consumes, plus the concrete plumbing components run on:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Network coordinator                       │
//! │   (weir-network: wires sockets, observes events, start/stop)  │
//! └──────────────────────────────────────────────────────────────┘
//!             │ attach / start / shutdown          ▲ ComponentEvent
//!             ▼                                    │
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Component (trait)                                            │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │ ComponentCore: ports, readiness, load, mailbox, events  │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//!             ▲ Delivery (mailbox)                 │ OutPort::send
//!             │                                    ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Socket: ordered point-to-point packet carrier                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Capability design
//!
//! The coordinator never feature-sniffs. [`Component`] is the core contract;
//! optional capabilities are surfaced explicitly:
//!
//! | Capability | Accessor | Consumed for |
//! |-----------|----------|--------------|
//! | subgraph  | [`Component::as_subgraph`] | event provenance, debug propagation |
//! | legacy activation | [`Component::is_legacy`] | open-connection accounting |
//!
//! # Self-driving processes
//!
//! Components are passive trait objects; [`spawn_driver`] turns one into a
//! running process by draining its mailbox in a spawned task, wrapping each
//! delivery in activate/deactivate accounting. Packet transport between
//! processes never nests component locks, so cyclic graphs cannot deadlock.
//!
//! # Testing
//!
//! The [`testing`] module ships small, well-behaved components (`Repeat`,
//! `Capture`, `Hold`, ...) used throughout the workspace's tests.

mod component;
mod driver;
mod error;
mod loader;
mod ports;
mod socket;
pub mod testing;

pub use component::{
    Component, ComponentCore, ComponentEventSubscriber, ComponentHandle, CoreBuilder,
    ReadinessHandle, SubgraphLink,
};
pub use driver::spawn_driver;
pub use error::ComponentError;
pub use loader::{ComponentFactory, ComponentLoader, Registry};
pub use ports::{InPort, InPorts, OutPort, OutPorts, PortError};
pub use socket::{Socket, SocketContext, SocketRef, SocketSubscriber};
