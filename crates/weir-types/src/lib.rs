//! Core vocabulary types for Weir.
//!
//! Weir is a Flow-Based Programming (FBP) runtime: a network of black-box
//! processes exchanging information packets over sockets. This crate is the
//! bottom of the workspace dependency stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Shared Vocabulary Layer                     │
//! │  (no runtime machinery, safe to depend on from anywhere)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  weir-types : Endpoint, SocketId, ErrorCode      ◄── HERE   │
//! │  weir-event : Packet, socket/component/network events       │
//! │  weir-graph : graph definition data model                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Contents
//!
//! - [`Endpoint`] - one end of a socket: a process, a port, and an optional
//!   index into an addressable port.
//! - [`SocketId`] - unique identity of a socket instance.
//! - [`ErrorCode`] - the unified error-code interface every Weir error type
//!   implements, plus the [`assert_error_code`]/[`assert_error_codes`] test
//!   helpers that keep the convention honest.

mod endpoint;
mod error;

pub use endpoint::{Endpoint, SocketId};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
