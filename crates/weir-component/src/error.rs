//! Component layer errors.
//!
//! All variants implement [`ErrorCode`] with the `COMPONENT_` prefix.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`UnknownComponent`](ComponentError::UnknownComponent) | `COMPONENT_UNKNOWN` | No |
//! | [`ExecutionFailed`](ComponentError::ExecutionFailed) | `COMPONENT_EXECUTION_FAILED` | Yes |
//! | [`StartFailed`](ComponentError::StartFailed) | `COMPONENT_START_FAILED` | Yes |
//! | [`ShutdownFailed`](ComponentError::ShutdownFailed) | `COMPONENT_SHUTDOWN_FAILED` | Yes |
//! | [`InvalidPacket`](ComponentError::InvalidPacket) | `COMPONENT_INVALID_PACKET` | No |
//! | [`Port`](ComponentError::Port) | `COMPONENT_PORT_MISUSE` | No |

use thiserror::Error;
use weir_types::ErrorCode;

/// Failure in a component or the component loader.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComponentError {
    /// The loader has no component registered under this name.
    #[error("no component registered as '{0}'")]
    UnknownComponent(String),

    /// Packet processing failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The component could not start.
    #[error("start failed: {0}")]
    StartFailed(String),

    /// The component could not shut down cleanly.
    #[error("shutdown failed: {0}")]
    ShutdownFailed(String),

    /// A packet arrived that the component cannot interpret.
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// A port was used against its addressing mode.
    #[error(transparent)]
    Port(#[from] crate::PortError),
}

impl ErrorCode for ComponentError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownComponent(_) => "COMPONENT_UNKNOWN",
            Self::ExecutionFailed(_) => "COMPONENT_EXECUTION_FAILED",
            Self::StartFailed(_) => "COMPONENT_START_FAILED",
            Self::ShutdownFailed(_) => "COMPONENT_SHUTDOWN_FAILED",
            Self::InvalidPacket(_) => "COMPONENT_INVALID_PACKET",
            Self::Port(_) => "COMPONENT_PORT_MISUSE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ExecutionFailed(_) | Self::StartFailed(_) | Self::ShutdownFailed(_)
        )
    }
}
