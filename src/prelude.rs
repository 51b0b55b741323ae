//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::backup::{BackupProgress, BackupTarget};
pub use crate::config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use crate::database::Database;
pub use crate::error::LiteDbError;
pub use crate::params::Params;
pub use crate::prepared::PreparedStatement;
pub use crate::results::Record;
pub use crate::sqlite_version;
pub use crate::types::Value;
