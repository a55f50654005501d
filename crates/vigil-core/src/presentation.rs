//! Narrow interface between the tracker and whatever draws the widget.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::format::{format_total, menu_label};

/// Receives state changes; implementations must not call back into the tracker.
pub trait PresentationSink: Send + Sync {
    /// The assertion was taken (`true`) or given back / refused (`false`).
    fn activity_changed(&self, active: bool);

    /// A freshly formatted live total, e.g. `"1h 2m"`.
    fn total_changed(&self, text: &str);

    /// Called once, the very first time the app runs on this machine.
    fn first_launch(&self) {}
}

/// What the stats view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSummary {
    pub total: Duration,
    pub text: String,
    pub active: bool,
}

/// How the user dismissed the stats view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsChoice {
    Dismiss,
    Reset,
}

/// On-demand detailed stats view that can also request a reset.
pub trait StatsView: Send + Sync {
    fn present(&self, summary: &StatsSummary) -> StatsChoice;
}

/// Last values pushed to the menu bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSnapshot {
    pub active: bool,
    pub label: String,
}

/// Sink backing the menu: remembers the indicator state and label and logs changes.
#[derive(Debug)]
pub struct MenuState {
    inner: RwLock<MenuSnapshot>,
}

impl MenuState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MenuSnapshot {
                active: false,
                label: menu_label(&format_total(Duration::ZERO)),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MenuSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MenuState {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationSink for MenuState {
    fn activity_changed(&self, active: bool) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if guard.active != active {
            log::info!(
                "Indicator {}",
                if active { "active" } else { "dimmed" }
            );
        }
        guard.active = active;
    }

    fn total_changed(&self, text: &str) {
        let label = menu_label(text);
        log::debug!("{label}");
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .label = label;
    }

    fn first_launch(&self) {
        log::info!("vigil is running!");
    }
}
