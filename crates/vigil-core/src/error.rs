use thiserror::Error;

/// The OS would not grant (or we could not request) display sleep prevention.
///
/// Never fatal: the tracker stays idle and the next enable tries again.
#[derive(Debug, Error)]
pub enum AssertionError {
    #[error("display sleep assertion denied: {0}")]
    Denied(String),
}
