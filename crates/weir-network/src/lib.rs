//! Network coordinator for Weir.
//!
//! This crate is the engine of a flow-based program: it takes a graph
//! definition (from [`weir_graph`]), instantiates processes and sockets in
//! a strict order, injects initial packets and port defaults, multiplexes
//! runtime events onto one stream, detects quiescence, and tears the
//! system down again.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weir-network : Network, Subgraph, NetworkOptions  ◄── HERE │
//! ├─────────────────────────────────────────────────────────────┤
//! │  weir-component : Component, ports, sockets, loader         │
//! │  weir-graph     : graph definition data model               │
//! │  weir-event     : packets and event vocabulary              │
//! │  weir-types     : endpoints, error codes                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! | Call | Effect |
//! |------|--------|
//! | [`Network::connect`] | nodes → edges → initial packets → defaults |
//! | [`Network::start`] | start components, post initials, fire defaults, emit `start` |
//! | quiescence | every process inactive for the debounce window → `end` |
//! | [`Network::stop`] | disconnect sockets, shut components down, emit `end` |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use weir_component::testing::{Capture, CaptureLog, Repeat};
//! use weir_component::Registry;
//! use weir_graph::Graph;
//! use weir_network::Network;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let log = CaptureLog::new();
//! let mut registry = Registry::new();
//! registry.register("Repeat", || Box::new(Repeat::new()));
//! let sink = log.clone();
//! registry.register("Capture", move || Box::new(Capture::new(sink.clone())));
//!
//! let mut graph = Graph::new("hello");
//! graph
//!     .add_node("a", Some("Repeat"))
//!     .add_node("b", Some("Capture"))
//!     .add_edge(("a", "out"), ("b", "in"))
//!     .add_initializer(json!("hello"), ("a", "in"));
//!
//! let mut network = Network::new(graph, Arc::new(registry));
//! let _events = network.subscribe();
//! network.connect().await.unwrap();
//! network.start().await.unwrap();
//!
//! // Let the pipeline drain.
//! for _ in 0..32 {
//!     tokio::task::yield_now().await;
//! }
//! assert_eq!(log.data(), vec![json!("hello")]);
//! # }
//! ```

mod error;
mod hub;
mod network;
mod options;
mod process;
mod quiescence;
mod state;
mod subgraph;

pub use error::{NetworkError, PortDirection};
pub use network::Network;
pub use options::NetworkOptions;
pub use process::ProcessRecord;
pub use subgraph::{Subgraph, SubgraphBuilder};
