//! Coordinator errors.
//!
//! Structural errors (unknown node, missing port, placeholder process) are
//! not recoverable: the request itself is wrong. Component failures pass
//! through with their own recoverability.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`UnknownNode`](NetworkError::UnknownNode) | `NETWORK_UNKNOWN_NODE` | No |
//! | [`NodeExists`](NetworkError::NodeExists) | `NETWORK_NODE_EXISTS` | No |
//! | [`NoComponent`](NetworkError::NoComponent) | `NETWORK_NO_COMPONENT` | No |
//! | [`NoSuchPort`](NetworkError::NoSuchPort) | `NETWORK_NO_SUCH_PORT` | No |
//! | [`Component`](NetworkError::Component) | `NETWORK_COMPONENT_FAILED` | inherited |

use thiserror::Error;
use weir_component::ComponentError;
use weir_types::ErrorCode;

/// Which side of a socket a port lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// The receiving side (an inport).
    Inbound,
    /// The writing side (an outport).
    Outbound,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inbound => write!(f, "inport"),
            Self::Outbound => write!(f, "outport"),
        }
    }
}

/// Failure in a coordinator operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// The referenced node is not in the process table.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// A rename collided with an existing node id.
    #[error("a node named '{0}' already exists")]
    NodeExists(String),

    /// The process is a reserved placeholder without a component instance.
    #[error("process '{0}' has no component instance")]
    NoComponent(String),

    /// A socket end was bound to a port the component does not define.
    #[error("No {direction} '{port}' defined in process {process}")]
    NoSuchPort {
        /// Which side the lookup was for.
        direction: PortDirection,
        /// The missing port name.
        port: String,
        /// The process the port was looked up on.
        process: String,
    },

    /// A component or loader failure, propagated verbatim.
    #[error(transparent)]
    Component(#[from] ComponentError),
}

impl ErrorCode for NetworkError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownNode(_) => "NETWORK_UNKNOWN_NODE",
            Self::NodeExists(_) => "NETWORK_NODE_EXISTS",
            Self::NoComponent(_) => "NETWORK_NO_COMPONENT",
            Self::NoSuchPort { .. } => "NETWORK_NO_SUCH_PORT",
            Self::Component(_) => "NETWORK_COMPONENT_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Component(inner) => inner.is_recoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_types::assert_error_codes;

    #[test]
    fn codes_follow_convention() {
        assert_error_codes(
            &[
                NetworkError::UnknownNode("x".into()),
                NetworkError::NodeExists("x".into()),
                NetworkError::NoComponent("x".into()),
                NetworkError::NoSuchPort {
                    direction: PortDirection::Inbound,
                    port: "in".into(),
                    process: "x".into(),
                },
                NetworkError::Component(ComponentError::ExecutionFailed("x".into())),
            ],
            "NETWORK_",
        );
    }

    #[test]
    fn missing_port_message_names_direction() {
        let inbound = NetworkError::NoSuchPort {
            direction: PortDirection::Inbound,
            port: "nosuch".into(),
            process: "b".into(),
        };
        assert_eq!(inbound.to_string(), "No inport 'nosuch' defined in process b");

        let outbound = NetworkError::NoSuchPort {
            direction: PortDirection::Outbound,
            port: "ghost".into(),
            process: "a".into(),
        };
        assert_eq!(outbound.to_string(), "No outport 'ghost' defined in process a");
    }

    #[test]
    fn component_recoverability_is_inherited() {
        let recoverable = NetworkError::Component(ComponentError::StartFailed("x".into()));
        assert!(recoverable.is_recoverable());

        let fatal = NetworkError::Component(ComponentError::UnknownComponent("x".into()));
        assert!(!fatal.is_recoverable());

        assert!(!NetworkError::UnknownNode("x".into()).is_recoverable());
    }
}
