//! Packets and event vocabulary for Weir.
//!
//! Everything that travels or is observed inside a Weir network is defined
//! here, so that the component layer and the network coordinator can talk
//! about the same values without depending on each other:
//!
//! ```text
//! ┌────────────┐  Packet   ┌────────────┐  Packet   ┌────────────┐
//! │  Process A │ ────────► │   Socket   │ ────────► │  Process B │
//! └────────────┘           └────────────┘           └────────────┘
//!                                │ SocketEvent
//!                                ▼
//!                      ┌───────────────────┐  NetworkEvent
//!                      │    Coordinator    │ ────────────► subscribers
//!                      └───────────────────┘
//!                                ▲ ComponentEvent
//!                       activate / deactivate / icon
//! ```
//!
//! # Contents
//!
//! | Type | Travels | Emitted by |
//! |------|---------|-----------|
//! | [`Packet`] | on sockets | components, initial packets, defaults |
//! | [`Delivery`] | into an inport mailbox | sockets |
//! | [`SocketEvent`] | to socket observers | sockets |
//! | [`ComponentEvent`] | to node observers | component cores |
//! | [`NetworkEvent`] | to network subscribers | the coordinator |

mod events;
mod packet;

pub use events::{ComponentEvent, Delivery, NetworkEvent, SocketEvent};
pub use packet::{Packet, PacketKind};
