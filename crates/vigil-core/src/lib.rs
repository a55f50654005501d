pub mod app;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod daemon_control;
pub mod error;
pub mod format;
pub mod ipc;
pub mod power;
pub mod presentation;
pub mod refresher;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::{AppContext, StatusSnapshot};
pub use daemon::Daemon;
pub use error::AssertionError;
pub use refresher::DisplayRefresher;
pub use tracker::{SessionTracker, SharedTracker};
