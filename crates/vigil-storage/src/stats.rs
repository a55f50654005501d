//! Durable storage for the cumulative active total.

use std::time::Duration;

use crate::db::Database;
use crate::error::PersistenceError;

/// Cumulative seconds the display has been kept awake, as a float.
pub const TOTAL_ACTIVE_SECONDS_KEY: &str = "totalActiveSeconds";

/// Set once the first launch has been announced.
pub const HAS_LAUNCHED_BEFORE_KEY: &str = "hasLaunchedBefore";

/// Truncate `total` to whole microseconds, the finest step that survives the
/// float-seconds encoding unchanged.
#[must_use]
pub fn to_stored_precision(total: Duration) -> Duration {
    Duration::new(total.as_secs(), total.subsec_micros() * 1_000)
}

/// The two-method contract the session tracker persists through.
pub trait StatsPersistence: Send {
    /// Last saved total, or zero when nothing usable is stored. Never fails.
    fn load(&self) -> Duration;

    /// Synchronously write `total`. Only whole microseconds are kept, see
    /// [`to_stored_precision`].
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store rejects the write
    fn save(&self, total: Duration) -> Result<(), PersistenceError>;
}

/// [`StatsPersistence`] over the `settings_kv` table.
pub struct SqliteStatsStore {
    db: Database,
}

impl SqliteStatsStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Whether a previous run already recorded its first launch.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag cannot be read
    pub fn has_launched_before(&self) -> Result<bool, PersistenceError> {
        match self.db.get_value(HAS_LAUNCHED_BEFORE_KEY)? {
            None => Ok(false),
            Some(raw) => parse_bool(&raw).ok_or(PersistenceError::InvalidValue {
                key: HAS_LAUNCHED_BEFORE_KEY.to_string(),
                value: raw,
            }),
        }
    }

    /// Record that the app has launched. Returns `true` if this is the first launch.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag cannot be read or written
    pub fn mark_launched(&self) -> Result<bool, PersistenceError> {
        if self.has_launched_before()? {
            return Ok(false);
        }
        self.db.set_value(HAS_LAUNCHED_BEFORE_KEY, "true")?;
        Ok(true)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn read_total(&self) -> Result<Option<Duration>, PersistenceError> {
        let Some(raw) = self.db.get_value(TOTAL_ACTIVE_SECONDS_KEY)? else {
            return Ok(None);
        };

        let invalid = || PersistenceError::InvalidValue {
            key: TOTAL_ACTIVE_SECONDS_KEY.to_string(),
            value: raw.clone(),
        };
        let seconds: f64 = raw.trim().parse().map_err(|_| invalid())?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid());
        }

        // Round to the nearest microsecond so a saved value reads back exactly.
        let micros = (seconds * 1e6).round();
        if micros >= u64::MAX as f64 {
            return Err(invalid());
        }
        Ok(Some(Duration::from_micros(micros as u64)))
    }
}

impl StatsPersistence for SqliteStatsStore {
    fn load(&self) -> Duration {
        match self.read_total() {
            Ok(Some(total)) => total,
            Ok(None) => Duration::ZERO,
            Err(e) => {
                log::warn!("Ignoring stored active total: {e}");
                Duration::ZERO
            }
        }
    }

    fn save(&self, total: Duration) -> Result<(), PersistenceError> {
        let total = to_stored_precision(total);
        self.db
            .set_value(TOTAL_ACTIVE_SECONDS_KEY, &total.as_secs_f64().to_string())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
