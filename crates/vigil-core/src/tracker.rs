//! Sleep-prevention session state machine and active time accounting.
//!
//! Two states: idle (no assertion) and active (assertion held, session open).
//! The assertion and the session start live in one `Option`, so one cannot
//! exist without the other.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use vigil_storage::{to_stored_precision, StatsPersistence};

use crate::clock::Clock;
use crate::error::AssertionError;
use crate::power::{Assertion, SleepInhibitor};
use crate::presentation::PresentationSink;

/// Tracker shared between IPC handlers, the refresher and the shutdown path.
pub type SharedTracker = Arc<Mutex<SessionTracker>>;

struct ActiveSession {
    _assertion: Box<dyn Assertion>,
    started: Instant,
    started_at: DateTime<Utc>,
}

pub struct SessionTracker {
    inhibitor: Box<dyn SleepInhibitor>,
    store: Box<dyn StatsPersistence>,
    sink: Arc<dyn PresentationSink>,
    clock: Arc<dyn Clock>,
    reason: String,
    session: Option<ActiveSession>,
    cumulative_total: Duration,
}

impl SessionTracker {
    /// Build an idle tracker, loading the persisted total once.
    pub fn new(
        inhibitor: Box<dyn SleepInhibitor>,
        store: Box<dyn StatsPersistence>,
        sink: Arc<dyn PresentationSink>,
        clock: Arc<dyn Clock>,
        reason: impl Into<String>,
    ) -> Self {
        let cumulative_total = store.load();
        log::info!("Loaded active total: {}s", cumulative_total.as_secs());

        Self {
            inhibitor,
            store,
            sink,
            clock,
            reason: reason.into(),
            session: None,
            cumulative_total,
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedTracker {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Wall-clock start of the open session (re-anchored by reset).
    #[must_use]
    pub fn active_since(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|s| s.started_at)
    }

    /// Total of closed sessions only.
    #[must_use]
    pub fn cumulative_total(&self) -> Duration {
        self.cumulative_total
    }

    /// Take the display assertion and open a session. No-op when already active.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError`] if the OS refuses; the tracker stays idle.
    pub fn enable(&mut self) -> Result<(), AssertionError> {
        if self.session.is_some() {
            return Ok(());
        }

        match self.inhibitor.acquire(&self.reason) {
            Ok(assertion) => {
                self.session = Some(ActiveSession {
                    _assertion: assertion,
                    started: self.clock.now(),
                    started_at: Utc::now(),
                });
                log::info!("Display sleep prevention enabled");
                self.sink.activity_changed(true);
                Ok(())
            }
            Err(e) => {
                log::warn!("Could not enable display sleep prevention: {e}");
                self.sink.activity_changed(false);
                Err(e)
            }
        }
    }

    /// Close the open session into the total, persist it and release the assertion.
    /// No-op when idle.
    pub fn disable(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let elapsed = self.clock.now().saturating_duration_since(session.started);
        self.cumulative_total += elapsed;
        self.persist();

        // Dropping the session releases the assertion.
        drop(session);
        log::info!(
            "Display sleep prevention disabled after {}s (total {}s)",
            elapsed.as_secs(),
            self.cumulative_total.as_secs()
        );
        self.sink.activity_changed(false);
    }

    /// Closed sessions plus the elapsed part of the open one.
    #[must_use]
    pub fn current_total(&self) -> Duration {
        match &self.session {
            Some(session) => {
                self.cumulative_total
                    + self.clock.now().saturating_duration_since(session.started)
            }
            None => self.cumulative_total,
        }
    }

    /// Clear the total. An open session keeps running but restarts from now,
    /// so time spent in it before the reset is dropped rather than flushed.
    pub fn reset(&mut self) {
        self.cumulative_total = Duration::ZERO;
        self.persist();

        if let Some(session) = self.session.as_mut() {
            session.started = self.clock.now();
            session.started_at = Utc::now();
        }
        log::info!("Active total reset");
    }

    /// Save the total. The in-memory value is first cut to what the store keeps,
    /// so a later load returns exactly what this tracker holds.
    fn persist(&mut self) {
        self.cumulative_total = to_stored_precision(self.cumulative_total);
        if let Err(e) = self.store.save(self.cumulative_total) {
            log::error!(
                "Failed to persist active total ({}s), keeping it in memory: {e}",
                self.cumulative_total.as_secs()
            );
        }
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        if self.is_active() {
            log::info!("Tracker dropped while active, closing session");
            self.disable();
        }
    }
}
