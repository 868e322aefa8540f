//! Information packets.
//!
//! A [`Packet`] is the only thing a socket carries. Besides plain data
//! packets there are two bracket kinds that open and close logical groups,
//! so a stream can carry substructure without a second channel.
//!
//! # Why no `Default`?
//!
//! **Do not implement `Default` for `Packet`.** A packet without a kind and
//! a payload chosen by the sender is meaningless; there is no sensible
//! default for either.
//!
//! # Example
//!
//! ```
//! use weir_event::{Packet, PacketKind};
//! use serde_json::json;
//!
//! let ip = Packet::data(json!({"user": "ada"}));
//! assert_eq!(ip.kind, PacketKind::Data);
//! assert!(!ip.initial);
//!
//! let iip = Packet::initial(json!("hello"));
//! assert!(iip.initial);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of an information packet.
///
/// | Kind | Meaning |
/// |------|---------|
/// | `Data` | payload-carrying packet |
/// | `OpenBracket` | opens a logical group |
/// | `CloseBracket` | closes the innermost open group |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketKind {
    /// Payload-carrying packet.
    Data,
    /// Opens a logical group.
    OpenBracket,
    /// Closes the innermost open group.
    CloseBracket,
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::OpenBracket => write!(f, "openbracket"),
            Self::CloseBracket => write!(f, "closebracket"),
        }
    }
}

/// An information packet travelling on a socket.
///
/// `initial` marks packets injected by the coordinator at network start
/// (initial information packets); components can use it to distinguish
/// configuration from live traffic. `subgraph` is the provenance trail for
/// packets observed across subgraph boundaries: node ids, outermost first.
/// It is empty until a parent network tags the packet on the way out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Packet kind.
    pub kind: PacketKind,
    /// Payload. Brackets conventionally carry a group name or `null`.
    pub data: Value,
    /// Set on packets injected at network start.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub initial: bool,
    /// Subgraph provenance, outermost node id first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subgraph: Vec<String>,
}

impl Packet {
    /// Creates a packet of the given kind.
    #[must_use]
    pub fn new(kind: PacketKind, data: Value) -> Self {
        Self {
            kind,
            data,
            initial: false,
            subgraph: Vec::new(),
        }
    }

    /// Creates a data packet.
    #[must_use]
    pub fn data(data: Value) -> Self {
        Self::new(PacketKind::Data, data)
    }

    /// Creates a data packet flagged as an initial information packet.
    #[must_use]
    pub fn initial(data: Value) -> Self {
        Self {
            initial: true,
            ..Self::new(PacketKind::Data, data)
        }
    }

    /// Creates an open-bracket packet.
    #[must_use]
    pub fn open_bracket(data: Value) -> Self {
        Self::new(PacketKind::OpenBracket, data)
    }

    /// Creates a close-bracket packet.
    #[must_use]
    pub fn close_bracket(data: Value) -> Self {
        Self::new(PacketKind::CloseBracket, data)
    }

    /// Returns `true` for data packets.
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.kind == PacketKind::Data
    }
}
