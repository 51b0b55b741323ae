//! Async `SQLite` access built on `rusqlite`.
//!
//! A [`Database`] runs `;`-separated statement chains, binds positional or
//! named parameters, projects rows into one of several shapes, batches a
//! statement over many parameter sets, and copies live databases with an
//! online backup.

mod backup;
mod config;
mod database;
mod error;
mod executor;
mod params;
mod prepared;
mod query;
mod results;
mod statement;
mod types;

pub mod prelude;

pub use backup::{BackupProgress, BackupTarget, RETRY_SLEEP, STEP_PAGES};
pub use config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use database::Database;
pub use error::LiteDbError;
pub use executor::TraceHook;
pub use params::Params;
pub use prepared::PreparedStatement;
pub use results::{ColumnIndex, Record};
pub use statement::first_statement;
pub use types::Value;

/// Version string of the linked `SQLite` library.
#[must_use]
pub fn sqlite_version() -> &'static str {
    rusqlite::version()
}
