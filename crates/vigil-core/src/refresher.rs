use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::format::format_total;
use crate::presentation::PresentationSink;
use crate::tracker::SharedTracker;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

// `tokio::time::interval` panics on a zero period.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(10);

/// Keeps the displayed total live while a session is open.
///
/// Only ever reads the tracker. The periodic task is owned through its
/// `JoinHandle` and aborted by [`DisplayRefresher::stop`] or on drop.
pub struct DisplayRefresher {
    tracker: SharedTracker,
    sink: Arc<dyn PresentationSink>,
    period: Duration,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl DisplayRefresher {
    #[must_use]
    pub fn new(tracker: SharedTracker, sink: Arc<dyn PresentationSink>, period: Duration) -> Self {
        Self {
            tracker,
            sink,
            period: period.max(MIN_REFRESH_INTERVAL),
            ticker: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the periodic task, replacing any previous one. The first tick fires immediately.
    pub async fn start(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let tracker = self.tracker.clone();
        let sink = self.sink.clone();
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                refresh_once(&tracker, sink.as_ref()).await;
            }
        });

        log::debug!("Display refresher started (every {}s)", period.as_secs());
        *ticker_guard = Some(handle);
    }

    /// Recompute and push the total right now. Returns the pushed text.
    pub async fn refresh_now(&self) -> String {
        refresh_once(&self.tracker, self.sink.as_ref()).await
    }

    pub async fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the periodic task. Safe to call more than once.
    pub async fn stop(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
            log::debug!("Display refresher stopped");
        }
    }
}

impl Drop for DisplayRefresher {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

async fn refresh_once(tracker: &SharedTracker, sink: &dyn PresentationSink) -> String {
    let total = tracker.lock().await.current_total();
    let text = format_total(total);
    sink.total_changed(&text);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Doubles, Harness, MemoryStore};

    fn refresher_for(h: Harness, period: Duration) -> (DisplayRefresher, Doubles) {
        let (shared, doubles) = h.into_shared();
        let refresher = DisplayRefresher::new(shared, doubles.sink.clone(), period);
        (refresher, doubles)
    }

    #[tokio::test]
    async fn test_refresh_now_pushes_formatted_total() {
        let h = Harness::with_store(MemoryStore::with_total(Duration::from_secs(3723)));
        let (refresher, d) = refresher_for(h, DEFAULT_REFRESH_INTERVAL);

        assert_eq!(refresher.refresh_now().await, "1h 2m");
        assert_eq!(d.sink.totals(), vec![String::from("1h 2m")]);
    }

    #[tokio::test]
    async fn test_refresh_includes_open_session() {
        let mut h = Harness::with_store(MemoryStore::with_total(Duration::from_secs(60)));
        h.tracker.enable().unwrap();
        let (refresher, d) = refresher_for(h, DEFAULT_REFRESH_INTERVAL);

        d.clock.advance(Duration::from_secs(3600));
        assert_eq!(refresher.refresh_now().await, "1h 1m");
        assert_eq!(d.store.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh_fires_every_period() {
        let (refresher, d) = refresher_for(Harness::new(), Duration::from_secs(60));

        refresher.start().await;
        assert!(refresher.is_running().await);

        // Immediate first tick plus two full periods.
        time::sleep(Duration::from_secs(121)).await;
        assert_eq!(d.sink.totals().len(), 3);

        refresher.stop().await;
        assert!(!refresher.is_running().await);

        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(d.sink.totals().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_task() {
        let (refresher, d) = refresher_for(Harness::new(), Duration::from_secs(60));

        refresher.start().await;
        time::sleep(Duration::from_secs(1)).await;
        refresher.start().await;
        time::sleep(Duration::from_secs(61)).await;

        // One tick from the first task, two from its replacement.
        assert_eq!(d.sink.totals().len(), 3);
        refresher.stop().await;
    }

    #[test]
    fn test_zero_period_is_clamped() {
        let (refresher, _d) = refresher_for(Harness::new(), Duration::ZERO);
        assert_eq!(refresher.period(), MIN_REFRESH_INTERVAL);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_harmless() {
        let (refresher, _d) = refresher_for(Harness::new(), DEFAULT_REFRESH_INTERVAL);
        refresher.stop().await;
        refresher.stop().await;
        assert!(!refresher.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_periodic_task() {
        let (refresher, d) = refresher_for(Harness::new(), Duration::from_secs(60));
        refresher.start().await;
        time::sleep(Duration::from_secs(1)).await;
        drop(refresher);

        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(d.sink.totals().len(), 1);
    }
}
