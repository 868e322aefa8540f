//! The subgraph component: a network behaving as a component.
//!
//! A [`Subgraph`] embeds a whole inner [`Network`] behind a component
//! facade. Outer inports are *exports*: each maps to an inport of an inner
//! process, wired through the inner coordinator's own attachment engine on
//! first start. Inner output is not wired to outer ports; the parent
//! coordinator observes it through the [`SubgraphLink`] event stream and
//! tags provenance, which is how results from arbitrarily deep nesting
//! surface.
//!
//! ```text
//! parent network
//!   └── node "s" = Subgraph
//!         ├── exports: "in" → inner x.IN
//!         └── inner network: x ──► y
//! ```

use crate::error::NetworkError;
use crate::network::Network;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::broadcast;
use weir_component::{Component, ComponentCore, ComponentError, SocketRef, SubgraphLink};
use weir_event::{Delivery, NetworkEvent};
use weir_types::Endpoint;

/// Builder for [`Subgraph`], collecting the export map.
pub struct SubgraphBuilder {
    network: Network,
    exports: Vec<(String, Endpoint)>,
}

impl SubgraphBuilder {
    /// Exposes an inner inport as an outer inport named `outer_port`.
    #[must_use]
    pub fn export(mut self, outer_port: impl Into<String>, inner: Endpoint) -> Self {
        self.exports.push((outer_port.into(), inner));
        self
    }

    /// Builds the component.
    #[must_use]
    pub fn finish(self) -> Subgraph {
        let mut core = ComponentCore::builder();
        for (outer_port, _) in &self.exports {
            core = core.inport(outer_port.clone());
        }
        Subgraph {
            core: core.finish(),
            network: self.network,
            exports: self.exports,
            wires: HashMap::new(),
            wired: false,
        }
    }
}

/// A component whose implementation is a nested network.
pub struct Subgraph {
    core: ComponentCore,
    network: Network,
    exports: Vec<(String, Endpoint)>,
    wires: HashMap<String, SocketRef>,
    wired: bool,
}

impl Subgraph {
    /// Starts building a subgraph component around an inner network.
    #[must_use]
    pub fn builder(network: Network) -> SubgraphBuilder {
        SubgraphBuilder {
            network,
            exports: Vec::new(),
        }
    }

    /// Returns the inner network.
    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }
}

#[async_trait]
impl Component for Subgraph {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn on_packet(&mut self, delivery: Delivery) -> Result<(), ComponentError> {
        let Some(socket) = self.wires.get(&delivery.port) else {
            return Err(ComponentError::InvalidPacket(format!(
                "no export wired for port '{}'",
                delivery.port
            )));
        };
        socket.lock().post(delivery.packet);
        Ok(())
    }

    /// Connects (once) and starts the inner network, wiring exported
    /// inports on the first pass.
    async fn start(&mut self) -> Result<(), ComponentError> {
        if !self.wired {
            self.network
                .connect()
                .await
                .map_err(|err: NetworkError| ComponentError::StartFailed(err.to_string()))?;
            for (outer_port, inner) in &self.exports {
                let socket = self
                    .network
                    .wire_external_inport(inner)
                    .await
                    .map_err(|err| ComponentError::StartFailed(err.to_string()))?;
                self.wires.insert(outer_port.clone(), socket);
            }
            self.wired = true;
        }
        self.network
            .start()
            .await
            .map_err(|err| ComponentError::StartFailed(err.to_string()))?;
        self.core.mark_started();
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        self.network
            .stop()
            .await
            .map_err(|err| ComponentError::ShutdownFailed(err.to_string()))?;
        self.core.mark_stopped();
        Ok(())
    }

    fn is_subgraph(&self) -> bool {
        true
    }

    fn as_subgraph(&mut self) -> Option<&mut dyn SubgraphLink> {
        Some(self)
    }
}

#[async_trait]
impl SubgraphLink for Subgraph {
    fn events(&self) -> broadcast::Receiver<NetworkEvent> {
        self.network.subscribe()
    }

    async fn set_debug(&mut self, active: bool) {
        self.network.set_debug(active).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use weir_component::testing::{Capture, CaptureLog, Repeat};
    use weir_component::Registry;
    use weir_graph::Graph;

    fn inner_network(log: CaptureLog) -> Network {
        let mut registry = Registry::new();
        registry.register("Repeat", || Box::new(Repeat::new()));
        registry.register("Capture", move || Box::new(Capture::new(log.clone())));

        let mut graph = Graph::new("inner");
        graph
            .add_node("x", Some("Repeat"))
            .add_node("y", Some("Capture"))
            .add_edge(("x", "out"), ("y", "in"));
        Network::new(graph, Arc::new(registry))
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn reports_the_subgraph_capability() {
        let log = CaptureLog::new();
        let mut subgraph = Subgraph::builder(inner_network(log))
            .export("in", Endpoint::new("x", "in"))
            .finish();

        assert!(subgraph.is_subgraph());
        assert!(subgraph.as_subgraph().is_some());
        assert!(subgraph.core().in_ports().get("in").is_some());
    }

    #[tokio::test]
    async fn start_wires_exports_and_forwards_packets() {
        let log = CaptureLog::new();
        let mut subgraph = Subgraph::builder(inner_network(log.clone()))
            .export("in", Endpoint::new("x", "in"))
            .finish();

        subgraph.start().await.unwrap();
        assert!(subgraph.core().is_started());

        subgraph
            .on_packet(Delivery {
                port: "in".into(),
                index: None,
                packet: weir_event::Packet::data(json!("through")),
            })
            .await
            .unwrap();
        settle().await;

        assert_eq!(log.data(), vec![json!("through")]);
    }

    #[tokio::test]
    async fn unexported_port_is_rejected() {
        let log = CaptureLog::new();
        let mut subgraph = Subgraph::builder(inner_network(log))
            .export("in", Endpoint::new("x", "in"))
            .finish();
        subgraph.start().await.unwrap();

        let err = subgraph
            .on_packet(Delivery {
                port: "ghost".into(),
                index: None,
                packet: weir_event::Packet::data(json!(1)),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ComponentError::InvalidPacket(_)));
    }

    #[tokio::test]
    async fn restart_does_not_rewire() {
        let log = CaptureLog::new();
        let mut subgraph = Subgraph::builder(inner_network(log))
            .export("in", Endpoint::new("x", "in"))
            .finish();

        subgraph.start().await.unwrap();
        let sockets_after_first = subgraph.network().socket_count();
        subgraph.shutdown().await.unwrap();
        subgraph.start().await.unwrap();
        assert_eq!(subgraph.network().socket_count(), sockets_after_first);
    }
}
