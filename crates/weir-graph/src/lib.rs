//! Graph definition data model for Weir.
//!
//! A graph is pure data: which processes exist, which ports are wired
//! together, and which values are injected at startup. The network
//! coordinator consumes it; nothing here executes anything.
//!
//! ```text
//! ┌──────────┐   edges    ┌──────────┐
//! │  nodes   │ ─────────► │  ports   │
//! └──────────┘            └──────────┘
//!       ▲
//!       │ initializers (value → inport)
//! ```
//!
//! Graphs serialize to and from JSON, so a definition can live in a file:
//!
//! ```
//! use weir_graph::Graph;
//! use serde_json::json;
//!
//! let mut graph = Graph::new("pipeline");
//! graph
//!     .add_node("reader", Some("Repeat"))
//!     .add_node("writer", Some("Repeat"))
//!     .add_edge(("reader", "out"), ("writer", "in"))
//!     .add_initializer(json!("hello"), ("reader", "in"));
//!
//! assert!(graph.validate().is_ok());
//! let json = serde_json::to_string(&graph).unwrap();
//! let restored: Graph = serde_json::from_str(&json).unwrap();
//! assert_eq!(restored.nodes.len(), 2);
//! ```

mod graph;

pub use graph::{Graph, GraphEdge, GraphError, GraphInitializer, GraphNode};
