//! Quiescence detection: debounced end, abort on reactivation, legacy
//! connection accounting.

mod common;

use common::{base_registry, pipeline, recv_until};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use weir_component::testing::{CaptureLog, Hold, Tally};
use weir_event::NetworkEvent;
use weir_graph::Graph;
use weir_network::Network;

#[tokio::test(start_paused = true)]
async fn quiescent_network_ends_exactly_once() {
    let (mut network, _log) = pipeline(json!("x")).await;
    let mut rx = network.subscribe();

    let begun = Instant::now();
    network.start().await.unwrap();
    recv_until(&mut rx, |e| matches!(e, NetworkEvent::End { .. })).await;
    assert!(
        begun.elapsed() >= Duration::from_millis(50),
        "end may not fire before the debounce window"
    );

    // Nothing further: one quiescence, one end.
    let more = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            if matches!(rx.recv().await, Ok(NetworkEvent::End { .. }) | Err(_)) {
                break;
            }
        }
    })
    .await;
    assert!(more.is_err(), "a second end fired");
    assert!(!network.is_started());
    assert!(!network.is_stopped(), "quiescence ends without stopping");
}

#[tokio::test(start_paused = true)]
async fn reactivation_aborts_the_pending_end() {
    // a(Repeat) deactivates immediately; h(Hold) reactivates inside the
    // 50 ms window and deactivates 30 ms later. The end must fire once,
    // 50 ms after the *last* deactivation.
    let log = CaptureLog::new();
    let mut registry = base_registry(&log);
    registry.register("Hold30", || {
        Box::new(Hold::new(Duration::from_millis(30)))
    });

    let mut graph = Graph::new("debounce");
    graph
        .add_node("a", Some("Repeat"))
        .add_node("h", Some("Hold30"))
        .add_node("b", Some("Capture"))
        .add_edge(("a", "out"), ("h", "in"))
        .add_edge(("h", "out"), ("b", "in"))
        .add_initializer(json!("tick"), ("a", "in"));

    let mut network = Network::new(graph, Arc::new(registry));
    let mut rx = network.subscribe();
    network.connect().await.unwrap();

    let begun = Instant::now();
    network.start().await.unwrap();
    recv_until(&mut rx, |e| matches!(e, NetworkEvent::End { .. })).await;

    // Hold deactivates at ~30 ms; the debounce re-arms from there.
    let elapsed = begun.elapsed();
    assert!(
        elapsed >= Duration::from_millis(80),
        "end fired at {elapsed:?}, inside an aborted window"
    );
    assert_eq!(log.data(), vec![json!("tick")]);
}

#[tokio::test(start_paused = true)]
async fn no_end_while_a_process_is_still_active() {
    let log = CaptureLog::new();
    let mut registry = base_registry(&log);
    registry.register("Hold200", || {
        Box::new(Hold::new(Duration::from_millis(200)))
    });

    let mut graph = Graph::new("busy");
    graph
        .add_node("a", Some("Repeat"))
        .add_node("h", Some("Hold200"))
        .add_edge(("a", "out"), ("h", "in"))
        .add_initializer(json!("slow"), ("a", "in"));

    let mut network = Network::new(graph, Arc::new(registry));
    let mut rx = network.subscribe();
    network.connect().await.unwrap();
    network.start().await.unwrap();

    // The repeater's own deactivation arms a window at ~0 ms, but the
    // holder is active until 200 ms: nothing may fire before that.
    let premature = tokio::time::timeout(Duration::from_millis(150), async {
        loop {
            if matches!(rx.recv().await, Ok(NetworkEvent::End { .. }) | Err(_)) {
                break;
            }
        }
    })
    .await;
    assert!(premature.is_err(), "end fired while the holder was active");

    recv_until(&mut rx, |e| matches!(e, NetworkEvent::End { .. })).await;
}

#[tokio::test(start_paused = true)]
async fn legacy_open_connections_keep_the_network_running() {
    let log = CaptureLog::new();
    let mut registry = base_registry(&log);
    registry.register("Tally", || Box::new(Tally::new()));

    let mut graph = Graph::new("legacy");
    graph
        .add_node("t", Some("Tally"))
        .add_node("b", Some("Capture"))
        .add_edge(("t", "out"), ("b", "in"))
        .add_initializer(json!("one"), ("t", "in"));

    let mut network = Network::new(graph, Arc::new(registry));
    let mut rx = network.subscribe();
    network.connect().await.unwrap();
    network.start().await.unwrap();

    common::eventually(|| log.len() == 1).await;
    // The tally's outbound socket stays connected, so the legacy
    // accounting keeps the process active and no end fires.
    assert!(network.is_running());
    assert_eq!(network.active_processes(), vec!["t"]);

    let premature = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            if matches!(rx.recv().await, Ok(NetworkEvent::End { .. }) | Err(_)) {
                break;
            }
        }
    })
    .await;
    assert!(premature.is_err(), "end fired with an open legacy connection");

    network.stop().await.unwrap();
    recv_until(&mut rx, |e| matches!(e, NetworkEvent::End { .. })).await;
    assert!(!network.is_running());
}

#[tokio::test(start_paused = true)]
async fn initial_packet_revives_an_ended_network() {
    let (mut network, log) = pipeline(json!("first")).await;
    let mut rx = network.subscribe();

    network.start().await.unwrap();
    recv_until(&mut rx, |e| matches!(e, NetworkEvent::End { .. })).await;
    assert!(!network.is_started());
    assert!(!network.is_stopped());

    // The network ended but was never stopped: a fresh initial packet
    // marks it started again and is delivered immediately.
    let initializer = weir_graph::GraphInitializer {
        data: json!("second"),
        to: weir_types::Endpoint::new("a", "in"),
        metadata: serde_json::Value::Null,
    };
    network.add_initial(&initializer).await.unwrap();

    recv_until(&mut rx, |e| matches!(e, NetworkEvent::Start { .. })).await;
    common::eventually(|| log.len() == 2).await;
    assert_eq!(log.data(), vec![json!("first"), json!("second")]);
    assert!(network.is_started());
}
