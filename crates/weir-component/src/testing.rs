//! Reusable components for exercising networks in tests.
//!
//! Small, deterministic behaviors used across the workspace's own test
//! suites and handy for anyone testing a coordinator-adjacent feature:
//!
//! | Component | Ports | Behavior |
//! |-----------|-------|----------|
//! | [`Repeat`] | `in` → `out` | forwards every packet |
//! | [`Capture`] | `in` | records received packets into a shared log |
//! | [`Tally`] | `in` → `out` | running count of data packets; legacy accounting |
//! | [`Merge`] | `in[]` → `out` | forwards from any slot of an addressable inport |
//! | [`Hold`] | `in` → `out` | sleeps before forwarding, to shape activation windows |
//! | [`Faulty`] | `in` | fails on every packet |
//! | [`SlowStart`] | `in` → `out` | starts not-ready; flip via a readiness handle |

use crate::component::{Component, ComponentCore};
use crate::error::ComponentError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use weir_event::{Delivery, Packet};

/// Forwards every packet from `in` to `out`.
pub struct Repeat {
    core: ComponentCore,
}

impl Repeat {
    /// Creates a plain repeater.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            core: ComponentCore::builder().inport("in").outport("out").finish(),
        }
    }

    /// Creates a repeater whose `in` port declares a default value.
    #[must_use]
    pub fn with_default(default: Value) -> Self {
        Self {
            core: ComponentCore::builder()
                .inport_with_default("in", default)
                .outport("out")
                .finish(),
        }
    }
}

#[async_trait]
impl Component for Repeat {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn on_packet(&mut self, delivery: Delivery) -> Result<(), ComponentError> {
        if let Some(out) = self.core.out_ports().get("out") {
            out.send(delivery.packet)?;
        }
        Ok(())
    }
}

/// Shared log of packets received by a [`Capture`].
#[derive(Clone, Default)]
pub struct CaptureLog(Arc<Mutex<Vec<Packet>>>);

impl CaptureLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the packets received so far.
    #[must_use]
    pub fn packets(&self) -> Vec<Packet> {
        self.0.lock().clone()
    }

    /// Returns the payloads of the data packets received so far.
    #[must_use]
    pub fn data(&self) -> Vec<Value> {
        self.0
            .lock()
            .iter()
            .filter(|p| p.is_data())
            .map(|p| p.data.clone())
            .collect()
    }

    /// Returns the number of packets received so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Returns `true` if nothing arrived yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn push(&self, packet: Packet) {
        self.0.lock().push(packet);
    }
}

/// Records every packet arriving on `in` into a [`CaptureLog`].
pub struct Capture {
    core: ComponentCore,
    log: CaptureLog,
}

impl Capture {
    /// Creates a capture writing into the given log.
    #[must_use]
    pub fn new(log: CaptureLog) -> Self {
        Self {
            core: ComponentCore::builder().inport("in").finish(),
            log,
        }
    }
}

#[async_trait]
impl Component for Capture {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn on_packet(&mut self, delivery: Delivery) -> Result<(), ComponentError> {
        self.log.push(delivery.packet);
        Ok(())
    }
}

/// Emits a running count of data packets; reports legacy activation.
///
/// `is_legacy` is `true`, so the coordinator accounts for this component
/// through socket connect/disconnect rather than load events.
pub struct Tally {
    core: ComponentCore,
    count: u64,
}

impl Tally {
    /// Creates a tally at zero.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            core: ComponentCore::builder().inport("in").outport("out").finish(),
            count: 0,
        }
    }
}

#[async_trait]
impl Component for Tally {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn on_packet(&mut self, delivery: Delivery) -> Result<(), ComponentError> {
        if !delivery.packet.is_data() {
            return Ok(());
        }
        self.count += 1;
        if let Some(out) = self.core.out_ports().get("out") {
            out.send(Packet::data(self.count.into()))?;
        }
        Ok(())
    }

    fn is_legacy(&self) -> bool {
        true
    }
}

/// Forwards packets arriving on any slot of the addressable `in` port.
pub struct Merge {
    core: ComponentCore,
}

impl Merge {
    /// Creates a merger.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            core: ComponentCore::builder()
                .addressable_inport("in")
                .outport("out")
                .finish(),
        }
    }
}

#[async_trait]
impl Component for Merge {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn on_packet(&mut self, delivery: Delivery) -> Result<(), ComponentError> {
        if let Some(out) = self.core.out_ports().get("out") {
            out.send(delivery.packet)?;
        }
        Ok(())
    }
}

/// Sleeps before forwarding, to shape activation windows in timing tests.
pub struct Hold {
    core: ComponentCore,
    delay: Duration,
}

impl Hold {
    /// Creates a holder with the given processing delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            core: ComponentCore::builder().inport("in").outport("out").finish(),
            delay,
        }
    }
}

#[async_trait]
impl Component for Hold {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn on_packet(&mut self, delivery: Delivery) -> Result<(), ComponentError> {
        tokio::time::sleep(self.delay).await;
        if let Some(out) = self.core.out_ports().get("out") {
            out.send(delivery.packet)?;
        }
        Ok(())
    }
}

/// Fails on every packet.
pub struct Faulty {
    core: ComponentCore,
}

impl Faulty {
    /// Creates a component that rejects everything.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            core: ComponentCore::builder().inport("in").finish(),
        }
    }
}

#[async_trait]
impl Component for Faulty {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn on_packet(&mut self, _delivery: Delivery) -> Result<(), ComponentError> {
        Err(ComponentError::ExecutionFailed("refusing packet".into()))
    }
}

/// A repeater that starts not-ready.
///
/// The coordinator's attachment operations wait for readiness; tests flip
/// it with the handle obtained from the core before boxing:
///
/// ```
/// use weir_component::testing::SlowStart;
/// use weir_component::Component;
///
/// let component = SlowStart::new();
/// let readiness = component.core().readiness_handle();
/// assert!(!component.core().is_ready());
/// readiness.set_ready();
/// assert!(component.core().is_ready());
/// ```
pub struct SlowStart {
    core: ComponentCore,
}

impl SlowStart {
    /// Creates a not-yet-ready repeater.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            core: ComponentCore::builder()
                .not_ready()
                .inport("in")
                .outport("out")
                .finish(),
        }
    }
}

#[async_trait]
impl Component for SlowStart {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn on_packet(&mut self, delivery: Delivery) -> Result<(), ComponentError> {
        if let Some(out) = self.core.out_ports().get("out") {
            out.send(delivery.packet)?;
        }
        Ok(())
    }
}
