//! Socket endpoint addressing.
//!
//! A socket connects two ports. Each end is described by an [`Endpoint`]:
//! which process, which port on that process, and - for *addressable*
//! (array-valued) ports - which slot.
//!
//! # Example
//!
//! ```
//! use weir_types::Endpoint;
//!
//! let plain = Endpoint::new("filter", "in");
//! assert_eq!(plain.to_string(), "filter.IN");
//!
//! let indexed = Endpoint::indexed("merge", "in", 2);
//! assert_eq!(indexed.to_string(), "merge.IN[2]");
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One end of a socket.
///
/// Process ids are graph-scoped strings chosen by whoever authored the
/// graph; port names are defined by the component. `index` is only
/// meaningful when the bound port is addressable - the coordinator clears
/// it when attaching to a plain port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Process (node) id within the graph.
    pub process: String,
    /// Port name on the process.
    pub port: String,
    /// Slot within an addressable port, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Endpoint {
    /// Creates an endpoint for a plain (non-addressable) port.
    #[must_use]
    pub fn new(process: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            port: port.into(),
            index: None,
        }
    }

    /// Creates an endpoint targeting a slot of an addressable port.
    #[must_use]
    pub fn indexed(process: impl Into<String>, port: impl Into<String>, index: usize) -> Self {
        Self {
            process: process.into(),
            port: port.into(),
            index: Some(index),
        }
    }

    /// Returns a copy of this endpoint with the index removed.
    ///
    /// Used when a socket is attached to a port that turns out not to be
    /// addressable: the index is dropped rather than kept around as a lie.
    #[must_use]
    pub fn without_index(&self) -> Self {
        Self {
            process: self.process.clone(),
            port: self.port.clone(),
            index: None,
        }
    }

    /// Returns `true` if `other` names the same process and port.
    ///
    /// Index-insensitive; use `==` for exact matching.
    #[must_use]
    pub fn same_port(&self, other: &Endpoint) -> bool {
        self.process == other.process && self.port == other.port
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}.{}[{}]", self.process, self.port.to_uppercase(), index),
            None => write!(f, "{}.{}", self.process, self.port.to_uppercase()),
        }
    }
}

impl From<(&str, &str)> for Endpoint {
    fn from((process, port): (&str, &str)) -> Self {
        Self::new(process, port)
    }
}

impl From<(&str, &str, usize)> for Endpoint {
    fn from((process, port, index): (&str, &str, usize)) -> Self {
        Self::indexed(process, port, index)
    }
}

/// Unique identity of a socket instance.
///
/// Sockets are created and destroyed as edges, initial packets, and port
/// defaults come and go; the id lets observers correlate events from the
/// same carrier without holding a reference to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketId(Uuid);

impl SocketId {
    /// Creates a fresh random id.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SocketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_display_plain() {
        let ep = Endpoint::new("filter", "in");
        assert_eq!(ep.to_string(), "filter.IN");
    }

    #[test]
    fn endpoint_display_indexed() {
        let ep = Endpoint::indexed("merge", "in", 2);
        assert_eq!(ep.to_string(), "merge.IN[2]");
    }

    #[test]
    fn endpoint_without_index() {
        let ep = Endpoint::indexed("merge", "in", 2);
        let plain = ep.without_index();
        assert_eq!(plain.index, None);
        assert_eq!(plain.process, "merge");
        assert_eq!(plain.port, "in");
    }

    #[test]
    fn endpoint_same_port_ignores_index() {
        let a = Endpoint::indexed("merge", "in", 0);
        let b = Endpoint::indexed("merge", "in", 1);
        assert!(a.same_port(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn endpoint_serde_roundtrip() {
        let ep = Endpoint::indexed("merge", "in", 3);
        let json = serde_json::to_string(&ep).unwrap();
        let restored: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(ep, restored);
    }

    #[test]
    fn endpoint_serde_omits_missing_index() {
        let ep = Endpoint::new("a", "out");
        let json = serde_json::to_string(&ep).unwrap();
        assert!(!json.contains("index"));
    }

    #[test]
    fn socket_ids_are_unique() {
        assert_ne!(SocketId::new(), SocketId::new());
    }
}
