//! Explicit application context: the one tracker, its refresher and the
//! widget visibility that drives enable/disable.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::format::format_total;
use crate::presentation::{PresentationSink, StatsChoice, StatsSummary, StatsView};
use crate::refresher::DisplayRefresher;
use crate::tracker::{SessionTracker, SharedTracker};

/// Point-in-time view for status queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub visible: bool,
    pub active: bool,
    pub total: Duration,
    pub active_since: Option<DateTime<Utc>>,
}

pub struct AppContext {
    tracker: SharedTracker,
    refresher: DisplayRefresher,
    visible: Mutex<bool>,
}

impl AppContext {
    /// Wrap `tracker`; the widget starts hidden until [`AppContext::launch`].
    #[must_use]
    pub fn new(
        tracker: SessionTracker,
        sink: Arc<dyn PresentationSink>,
        refresh_interval: Duration,
    ) -> Self {
        let tracker = tracker.into_shared();
        let refresher = DisplayRefresher::new(tracker.clone(), sink, refresh_interval);
        Self {
            tracker,
            refresher,
            visible: Mutex::new(false),
        }
    }

    #[must_use]
    pub fn tracker(&self) -> SharedTracker {
        self.tracker.clone()
    }

    /// Start the periodic refresh and, if asked, show the widget (which enables).
    pub async fn launch(&self, start_visible: bool) {
        self.refresher.start().await;
        if start_visible {
            self.show().await;
        }
    }

    /// Show the widget and keep the display awake. Returns whether the assertion is held.
    pub async fn show(&self) -> bool {
        let mut visible = self.visible.lock().await;
        *visible = true;
        let active = self.enable_tracker().await;
        drop(visible);

        self.refresher.refresh_now().await;
        active
    }

    /// Hide the widget and let the display sleep again.
    pub async fn hide(&self) {
        let mut visible = self.visible.lock().await;
        *visible = false;
        self.tracker.lock().await.disable();
        drop(visible);

        self.refresher.refresh_now().await;
    }

    /// Flip visibility. Returns the new visibility.
    ///
    /// The visibility lock is held from the decision through the enable or
    /// disable, so concurrent toggles apply one after the other.
    pub async fn toggle(&self) -> bool {
        let mut visible = self.visible.lock().await;
        *visible = !*visible;
        let now_visible = *visible;
        if now_visible {
            self.enable_tracker().await;
        } else {
            self.tracker.lock().await.disable();
        }
        drop(visible);

        self.refresher.refresh_now().await;
        now_visible
    }

    /// Zero the total and push the new value immediately.
    pub async fn reset(&self) {
        self.tracker.lock().await.reset();
        self.refresher.refresh_now().await;
    }

    /// Refresh, present the stats view and apply its choice.
    pub async fn open_stats(&self, view: &dyn StatsView) -> StatsChoice {
        let summary = self.stats_summary().await;
        let choice = view.present(&summary);
        if choice == StatsChoice::Reset {
            self.reset().await;
        }
        choice
    }

    pub async fn stats_summary(&self) -> StatsSummary {
        let text = self.refresher.refresh_now().await;
        let tracker = self.tracker.lock().await;
        StatsSummary {
            total: tracker.current_total(),
            text,
            active: tracker.is_active(),
        }
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let visible = *self.visible.lock().await;
        let tracker = self.tracker.lock().await;
        StatusSnapshot {
            visible,
            active: tracker.is_active(),
            total: tracker.current_total(),
            active_since: tracker.active_since(),
        }
    }

    /// Stop refreshing and close any open session so no time is lost.
    pub async fn shutdown(&self) {
        self.refresher.stop().await;
        let mut tracker = self.tracker.lock().await;
        tracker.disable();
        log::info!(
            "Shut down with total {} ({}s)",
            format_total(tracker.cumulative_total()),
            tracker.cumulative_total().as_secs()
        );
    }

    async fn enable_tracker(&self) -> bool {
        let mut tracker = self.tracker.lock().await;
        match tracker.enable() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Widget shown without sleep prevention: {e}");
                false
            }
        }
    }
}
