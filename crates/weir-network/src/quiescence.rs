//! Activation tracking for quiescence detection.
//!
//! A network is running while any process is active. Two accounting
//! schemes coexist:
//!
//! - modern components report a load (in-flight work count) through
//!   activate/deactivate events;
//! - legacy components are accounted through open socket connections on
//!   their outbound side.
//!
//! The active set is the union. Values are cached here from the event
//! stream rather than read from components, because the observers that
//! need them run synchronously and component locks are asynchronous;
//! events are the only way either number changes, so the cache cannot go
//! stale.
//!
//! The debounced end itself is armed by the coordinator: every qualifying
//! deactivation bumps [`arm`](QuiescenceState::arm) and spawns a fresh
//! timer; stale generations no-op, and any activation in the window flips
//! the abort flag the timer honors.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct QuiescenceState {
    loads: HashMap<String, usize>,
    open_connections: HashMap<String, usize>,
    abort_pending: bool,
    generation: u64,
}

impl QuiescenceState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Caches a process's reported load.
    pub(crate) fn record_load(&mut self, node: &str, load: usize) {
        if load == 0 {
            self.loads.remove(node);
        } else {
            self.loads.insert(node.to_string(), load);
        }
    }

    /// Counts a legacy connection opening. Returns the new count.
    pub(crate) fn connection_opened(&mut self, node: &str) -> usize {
        let count = self.open_connections.entry(node.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Counts a legacy connection closing. Returns the new count.
    pub(crate) fn connection_closed(&mut self, node: &str) -> usize {
        match self.open_connections.get_mut(node) {
            Some(count) => {
                *count = count.saturating_sub(1);
                let remaining = *count;
                if remaining == 0 {
                    self.open_connections.remove(node);
                }
                remaining
            }
            None => 0,
        }
    }

    /// Returns the ids of active processes, sorted for determinism.
    pub(crate) fn active_processes(&self) -> Vec<String> {
        let mut active: Vec<String> = self
            .loads
            .keys()
            .chain(self.open_connections.keys())
            .cloned()
            .collect();
        active.sort_unstable();
        active.dedup();
        active
    }

    /// Returns `true` while any process is active.
    pub(crate) fn is_running(&self) -> bool {
        !self.loads.is_empty() || !self.open_connections.is_empty()
    }

    /// Flags a pending debounced end for abortion.
    pub(crate) fn request_abort(&mut self) {
        self.abort_pending = true;
    }

    pub(crate) fn abort_requested(&self) -> bool {
        self.abort_pending
    }

    /// Arms a fresh debounce window: clears the abort flag and returns the
    /// new generation. Earlier windows see a stale generation and no-op.
    pub(crate) fn arm(&mut self) -> u64 {
        self.abort_pending = false;
        self.generation += 1;
        self.generation
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Drops all accounting for a removed process.
    pub(crate) fn forget(&mut self, node: &str) {
        self.loads.remove(node);
        self.open_connections.remove(node);
    }

    /// Re-keys accounting across a rename.
    pub(crate) fn rename(&mut self, old: &str, new: &str) {
        if let Some(load) = self.loads.remove(old) {
            self.loads.insert(new.to_string(), load);
        }
        if let Some(count) = self.open_connections.remove(old) {
            self.open_connections.insert(new.to_string(), count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_network_is_not_running() {
        let state = QuiescenceState::new();
        assert!(!state.is_running());
        assert!(state.active_processes().is_empty());
    }

    #[test]
    fn load_makes_a_process_active() {
        let mut state = QuiescenceState::new();
        state.record_load("a", 2);
        assert!(state.is_running());
        assert_eq!(state.active_processes(), vec!["a"]);

        state.record_load("a", 0);
        assert!(!state.is_running());
    }

    #[test]
    fn active_set_is_the_union_of_both_schemes() {
        let mut state = QuiescenceState::new();
        state.record_load("modern", 1);
        state.connection_opened("legacy");
        assert_eq!(state.active_processes(), vec!["legacy", "modern"]);
    }

    #[test]
    fn connection_counting_balances() {
        let mut state = QuiescenceState::new();
        assert_eq!(state.connection_opened("a"), 1);
        assert_eq!(state.connection_opened("a"), 2);
        assert_eq!(state.connection_closed("a"), 1);
        assert!(state.is_running());
        assert_eq!(state.connection_closed("a"), 0);
        assert!(!state.is_running());
        // Unbalanced closes stay at zero.
        assert_eq!(state.connection_closed("a"), 0);
    }

    #[test]
    fn same_process_in_both_schemes_appears_once() {
        let mut state = QuiescenceState::new();
        state.record_load("a", 1);
        state.connection_opened("a");
        assert_eq!(state.active_processes(), vec!["a"]);
    }

    #[test]
    fn arm_clears_abort_and_bumps_generation() {
        let mut state = QuiescenceState::new();
        state.request_abort();
        assert!(state.abort_requested());

        let first = state.arm();
        assert!(!state.abort_requested());
        let second = state.arm();
        assert!(second > first);
        assert_eq!(state.generation(), second);
    }

    #[test]
    fn forget_and_rename() {
        let mut state = QuiescenceState::new();
        state.record_load("a", 1);
        state.connection_opened("a");

        state.rename("a", "b");
        assert_eq!(state.active_processes(), vec!["b"]);

        state.forget("b");
        assert!(!state.is_running());
    }
}
