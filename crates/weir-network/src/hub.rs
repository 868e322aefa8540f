//! Event emission with pre-start buffering.
//!
//! The coordinator's outbound stream has one wrinkle: a network does a lot
//! of observable work (initial packets, defaults) before it formally
//! starts, and subscribers expect to see `start` first. The hub therefore
//! buffers most events while the network is not started and replays them,
//! in arrival order, immediately after the `start` event goes out.
//!
//! Errors and terminal events bypass the buffer - see
//! [`NetworkEvent::bypasses_buffer`].
//!
//! # Unhandled process errors
//!
//! A `process-error` emitted while nobody subscribes to the stream panics
//! instead of vanishing into a buffer or a dead broadcast channel. Callers
//! that care must subscribe before driving the network.

use tokio::sync::broadcast;
use weir_event::NetworkEvent;

pub(crate) struct EventHub {
    tx: broadcast::Sender<NetworkEvent>,
    buffer: Vec<NetworkEvent>,
}

impl EventHub {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            buffer: Vec::new(),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Emits an event under the buffering rule.
    ///
    /// `started` is the network's run state at emission time. `Start`
    /// itself flushes the buffer after going out; `Ip` events additionally
    /// produce their legacy synthesis right behind them.
    pub(crate) fn emit(&mut self, event: NetworkEvent, started: bool) {
        if matches!(event, NetworkEvent::Start { .. }) {
            self.dispatch(event);
            for buffered in std::mem::take(&mut self.buffer) {
                self.dispatch(buffered);
            }
            return;
        }

        let legacy = event.legacy_synthesis();
        if started || event.bypasses_buffer() {
            self.dispatch(event);
        } else {
            self.buffer.push(event);
        }
        if let Some(legacy) = legacy {
            if started {
                self.dispatch(legacy);
            } else {
                self.buffer.push(legacy);
            }
        }
    }

    pub(crate) fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    fn dispatch(&self, event: NetworkEvent) {
        if let NetworkEvent::ProcessError { process, error, .. } = &event {
            if self.tx.receiver_count() == 0 {
                panic!("unhandled process error in '{process}': {error}");
            }
        }
        // Other kinds are fine to drop when nobody listens.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weir_event::Packet;
    use weir_types::{Endpoint, SocketId};

    fn ip() -> NetworkEvent {
        NetworkEvent::Ip {
            socket: SocketId::new(),
            from: None,
            to: Some(Endpoint::new("b", "in")),
            packet: Packet::data(json!(1)),
        }
    }

    fn start() -> NetworkEvent {
        NetworkEvent::Start {
            start: chrono::Utc::now(),
        }
    }

    fn drain(rx: &mut broadcast::Receiver<NetworkEvent>) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind_name());
        }
        kinds
    }

    #[test]
    fn buffers_until_start_then_flushes_in_order() {
        let mut hub = EventHub::new(16);
        let mut rx = hub.subscribe();

        hub.emit(ip(), false);
        hub.emit(
            NetworkEvent::Connect {
                socket: SocketId::new(),
            },
            false,
        );
        assert!(drain(&mut rx).is_empty());

        hub.emit(start(), false);
        assert_eq!(drain(&mut rx), vec!["start", "ip", "data", "connect"]);
    }

    #[test]
    fn started_network_emits_directly() {
        let mut hub = EventHub::new(16);
        let mut rx = hub.subscribe();

        hub.emit(ip(), true);
        assert_eq!(drain(&mut rx), vec!["ip", "data"]);
    }

    #[test]
    fn icon_bypasses_the_buffer() {
        let mut hub = EventHub::new(16);
        let mut rx = hub.subscribe();

        hub.emit(
            NetworkEvent::Icon {
                process: "a".into(),
                icon: "gear".into(),
            },
            false,
        );
        assert_eq!(drain(&mut rx), vec!["icon"]);
    }

    #[test]
    fn bracket_packets_synthesize_group_events() {
        let mut hub = EventHub::new(16);
        let mut rx = hub.subscribe();

        let event = NetworkEvent::Ip {
            socket: SocketId::new(),
            from: None,
            to: None,
            packet: Packet::open_bracket(json!("g")),
        };
        hub.emit(event, true);
        assert_eq!(drain(&mut rx), vec!["ip", "begingroup"]);
    }

    #[test]
    fn process_error_with_subscriber_is_delivered() {
        let mut hub = EventHub::new(16);
        let mut rx = hub.subscribe();

        hub.emit(
            NetworkEvent::ProcessError {
                process: "a".into(),
                error: "boom".into(),
                subgraph: vec![],
            },
            false,
        );
        assert_eq!(drain(&mut rx), vec!["process-error"]);
    }

    #[test]
    #[should_panic(expected = "unhandled process error in 'a': boom")]
    fn process_error_without_subscriber_panics() {
        let mut hub = EventHub::new(16);
        hub.emit(
            NetworkEvent::ProcessError {
                process: "a".into(),
                error: "boom".into(),
                subgraph: vec![],
            },
            true,
        );
    }

    #[test]
    fn dropped_subscriber_no_longer_counts() {
        let mut hub = EventHub::new(16);
        let rx = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(rx);
        assert_eq!(hub.subscriber_count(), 0);
        // Non-error events are silently droppable.
        hub.emit(ip(), true);
    }

    #[test]
    fn clear_buffer_discards_pending_events() {
        let mut hub = EventHub::new(16);
        let mut rx = hub.subscribe();

        hub.emit(ip(), false);
        hub.clear_buffer();
        hub.emit(start(), false);
        assert_eq!(drain(&mut rx), vec!["start"]);
    }
}
