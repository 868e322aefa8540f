//! Shared fixtures for the coordinator integration suites.
#![allow(dead_code)]

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use weir_component::testing::{Capture, CaptureLog, Repeat};
use weir_component::Registry;
use weir_event::NetworkEvent;
use weir_graph::Graph;
use weir_network::Network;

/// A registry with `Repeat` and a `Capture` writing into `log`.
pub fn base_registry(log: &CaptureLog) -> Registry {
    let mut registry = Registry::new();
    registry.register("Repeat", || Box::new(Repeat::new()));
    let sink = log.clone();
    registry.register("Capture", move || Box::new(Capture::new(sink.clone())));
    registry
}

/// `a(Repeat) → b(Capture)` with an initial packet into `a.IN`.
pub fn pipeline_graph(payload: Value) -> Graph {
    let mut graph = Graph::new("pipeline");
    graph
        .add_node("a", Some("Repeat"))
        .add_node("b", Some("Capture"))
        .add_edge(("a", "out"), ("b", "in"))
        .add_initializer(payload, ("a", "in"));
    graph
}

/// A connected pipeline network plus its capture log.
pub async fn pipeline(payload: Value) -> (Network, CaptureLog) {
    let log = CaptureLog::new();
    let registry = base_registry(&log);
    let mut network = Network::new(pipeline_graph(payload), Arc::new(registry));
    network.connect().await.expect("connect");
    (network, log)
}

/// Polls `condition` with tiny sleeps (paused-clock friendly).
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached in time");
}

/// Receives events until the predicate matches, with a generous timeout.
pub async fn recv_until(
    rx: &mut broadcast::Receiver<NetworkEvent>,
    mut predicate: impl FnMut(&NetworkEvent) -> bool,
) -> NetworkEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed");
        if predicate(&event) {
            return event;
        }
    }
}

/// Drains everything currently queued on the receiver.
pub fn drain(rx: &mut broadcast::Receiver<NetworkEvent>) -> Vec<NetworkEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
