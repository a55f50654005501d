//! Human-readable renderings of the active total.

use std::time::Duration;

/// `"{hours}h {minutes}m"`, both floored.
#[must_use]
pub fn format_total(total: Duration) -> String {
    let secs = total.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    format!("{hours}h {minutes}m")
}

/// Menu item text built from an already formatted total.
#[must_use]
pub fn menu_label(formatted_total: &str) -> String {
    format!("Stats: {formatted_total} active")
}

/// Body of the detailed stats view.
#[must_use]
pub fn stats_message(total: Duration) -> String {
    format!("Total time keeping screen awake:\n{}", format_total(total))
}
