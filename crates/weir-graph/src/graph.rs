//! Graph nodes, edges, and initializers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use weir_types::{Endpoint, ErrorCode};

/// A process declaration.
///
/// A node without a component name is a reserved placeholder: the
/// coordinator registers it but loads nothing for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Graph-unique process id.
    pub id: String,
    /// Component to instantiate, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Free-form metadata handed to the loader.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// A connection between an outport and an inport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Writing end (an outport).
    pub from: Endpoint,
    /// Receiving end (an inport).
    pub to: Endpoint,
    /// Free-form metadata carried onto the socket.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// A value injected into an inport on every network start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInitializer {
    /// The value to inject.
    pub data: Value,
    /// Receiving end (an inport).
    pub to: Endpoint,
    /// Free-form metadata carried onto the socket.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// A complete graph definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Human-readable graph name.
    pub name: String,
    /// Declared processes.
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// Port-to-port connections.
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Startup value injections.
    #[serde(default)]
    pub initializers: Vec<GraphInitializer>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declares a process. Chainable.
    pub fn add_node(&mut self, id: impl Into<String>, component: Option<&str>) -> &mut Self {
        self.nodes.push(GraphNode {
            id: id.into(),
            component: component.map(str::to_owned),
            metadata: Value::Null,
        });
        self
    }

    /// Declares a process with loader metadata. Chainable.
    pub fn add_node_with_metadata(
        &mut self,
        id: impl Into<String>,
        component: Option<&str>,
        metadata: Value,
    ) -> &mut Self {
        self.nodes.push(GraphNode {
            id: id.into(),
            component: component.map(str::to_owned),
            metadata,
        });
        self
    }

    /// Wires an outport to an inport. Chainable.
    pub fn add_edge(&mut self, from: impl Into<Endpoint>, to: impl Into<Endpoint>) -> &mut Self {
        self.edges.push(GraphEdge {
            from: from.into(),
            to: to.into(),
            metadata: Value::Null,
        });
        self
    }

    /// Injects a value into an inport at startup. Chainable.
    pub fn add_initializer(&mut self, data: Value, to: impl Into<Endpoint>) -> &mut Self {
        self.initializers.push(GraphInitializer {
            data,
            to: to.into(),
            metadata: Value::Null,
        });
        self
    }

    /// Looks a node up by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Checks structural consistency: unique node ids, no dangling
    /// edge or initializer endpoints.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, in declaration order.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !seen.contains(endpoint.process.as_str()) {
                    return Err(GraphError::MissingNode {
                        node: endpoint.process.clone(),
                        referenced_by: format!("edge {} -> {}", edge.from, edge.to),
                    });
                }
            }
        }
        for init in &self.initializers {
            if !seen.contains(init.to.process.as_str()) {
                return Err(GraphError::MissingNode {
                    node: init.to.process.clone(),
                    referenced_by: format!("initializer -> {}", init.to),
                });
            }
        }
        Ok(())
    }
}

/// Structural problems in a graph definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Two nodes share an id.
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// An edge or initializer references an undeclared node.
    #[error("node '{node}' referenced by {referenced_by} is not declared")]
    MissingNode {
        /// The undeclared node id.
        node: String,
        /// Human-readable description of the referencing element.
        referenced_by: String,
    },
}

impl ErrorCode for GraphError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateNode(_) => "GRAPH_DUPLICATE_NODE",
            Self::MissingNode { .. } => "GRAPH_MISSING_NODE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
