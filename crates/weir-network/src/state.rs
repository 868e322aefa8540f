//! The run-state machine.
//!
//! Two bits and a timestamp:
//!
//! ```text
//!            set_started                set_ended
//! stopped ───────────────► started ───────────────► idle (¬started ∧ ¬stopped)
//!    ▲                        │                        │
//!    │                        │ stop()                 │ set_stopped_flag
//!    └────────────────────────┴────────────────────────┘
//! ```
//!
//! `started ∧ stopped` is never true. The idle third state - not started,
//! not stopped - is what a network looks like after quiescence detection
//! ends it: a later initial packet may revive it without an explicit
//! `start`.
//!
//! The startup timestamp is set on the first start and survives restarts,
//! so uptime measures from the original start as long as the network keeps
//! the same identity.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct StartStamp {
    wall: DateTime<Utc>,
    mono: Instant,
}

#[derive(Debug)]
pub(crate) struct RunState {
    started: bool,
    stopped: bool,
    startup: Option<StartStamp>,
}

impl RunState {
    pub(crate) fn new() -> Self {
        Self {
            started: false,
            stopped: true,
            startup: None,
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Transitions to started. Returns the startup timestamp to announce,
    /// or `None` if already started.
    pub(crate) fn set_started(&mut self) -> Option<DateTime<Utc>> {
        if self.started {
            return None;
        }
        let stamp = self.startup.get_or_insert_with(|| StartStamp {
            wall: Utc::now(),
            mono: Instant::now(),
        });
        self.started = true;
        self.stopped = false;
        Some(stamp.wall)
    }

    /// Leaves the started state. Returns the `(start, end, uptime)` payload
    /// to announce, or `None` if the network was not started.
    ///
    /// Does not touch the stopped bit; quiescence ends a network without
    /// stopping it.
    pub(crate) fn set_ended(&mut self) -> Option<(DateTime<Utc>, DateTime<Utc>, Duration)> {
        if !self.started {
            return None;
        }
        self.started = false;
        let stamp = self.startup?;
        Some((stamp.wall, Utc::now(), stamp.mono.elapsed()))
    }

    /// Records the explicit stop. Only legal when not started.
    pub(crate) fn set_stopped_flag(&mut self) {
        debug_assert!(!self.started, "stopped while started");
        self.stopped = true;
    }

    /// Time spent started, zero while not started.
    pub(crate) fn uptime(&self) -> Duration {
        if !self.started {
            return Duration::ZERO;
        }
        self.startup
            .map(|stamp| stamp.mono.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}
