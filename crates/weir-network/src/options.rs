//! Coordinator tuning knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for a [`Network`](crate::Network).
///
/// The defaults are what the rest of the documentation assumes; override
/// only what a deployment actually needs.
///
/// # Example
///
/// ```
/// use weir_network::NetworkOptions;
///
/// let options = NetworkOptions {
///     quiescence_debounce_ms: 100,
///     ..NetworkOptions::default()
/// };
/// assert_eq!(options.event_capacity, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkOptions {
    /// How long every process must stay inactive before the network is
    /// considered finished.
    pub quiescence_debounce_ms: u64,
    /// Capacity of the outbound event channel; slow subscribers lag past
    /// this many buffered events.
    pub event_capacity: usize,
    /// During `connect`, yield to the scheduler after this many elements of
    /// a phase, bounding synchronous recursion on large graphs. Zero
    /// disables yielding.
    pub connect_yield_interval: usize,
    /// Start with per-packet trace logging enabled on every socket.
    pub debug: bool,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            quiescence_debounce_ms: 50,
            event_capacity: 256,
            connect_yield_interval: 100,
            debug: false,
        }
    }
}

impl NetworkOptions {
    pub(crate) fn debounce(&self) -> Duration {
        Duration::from_millis(self.quiescence_debounce_ms)
    }
}
