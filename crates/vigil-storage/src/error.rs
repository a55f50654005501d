use thiserror::Error;

/// Failure writing to or reading from the settings store.
///
/// Never fatal: callers log it and keep their in-memory state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("settings store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid value {value:?} stored under {key}")]
    InvalidValue { key: String, value: String },
}
