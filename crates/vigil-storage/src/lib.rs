pub mod db;
pub mod error;
pub mod migrations;
pub mod stats;

pub use db::Database;
pub use error::PersistenceError;
pub use stats::{
    to_stored_precision, SqliteStatsStore, StatsPersistence, HAS_LAUNCHED_BEFORE_KEY,
    TOTAL_ACTIVE_SECONDS_KEY,
};
