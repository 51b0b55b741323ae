use std::time::Duration;

use rusqlite::OptionalExtension;
use rusqlite::limits::Limit;
use tracing::debug;

use crate::error::LiteDbError;
use crate::executor;

use super::{Database, run_blocking};

/// Map the engine's numeric limit category onto `rusqlite`'s enum.
fn limit_category(category: i32) -> Result<Limit, LiteDbError> {
    let limit = match category {
        0 => Limit::SQLITE_LIMIT_LENGTH,
        1 => Limit::SQLITE_LIMIT_SQL_LENGTH,
        2 => Limit::SQLITE_LIMIT_COLUMN,
        3 => Limit::SQLITE_LIMIT_EXPR_DEPTH,
        4 => Limit::SQLITE_LIMIT_COMPOUND_SELECT,
        5 => Limit::SQLITE_LIMIT_VDBE_OP,
        6 => Limit::SQLITE_LIMIT_FUNCTION_ARG,
        7 => Limit::SQLITE_LIMIT_ATTACHED,
        8 => Limit::SQLITE_LIMIT_LIKE_PATTERN_LENGTH,
        9 => Limit::SQLITE_LIMIT_VARIABLE_NUMBER,
        10 => Limit::SQLITE_LIMIT_TRIGGER_DEPTH,
        11 => Limit::SQLITE_LIMIT_WORKER_THREADS,
        other => return Err(LiteDbError::InvalidLimitCategory(other)),
    };
    Ok(limit)
}

impl Database {
    /// Set how long the engine waits on a locked database before reporting busy.
    ///
    /// `None` removes the busy handler, so contention fails immediately.
    ///
    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub async fn set_busy_timeout(&self, timeout: Option<Duration>) -> Result<&Self, LiteDbError> {
        run_blocking(self.shared(), move |conn| {
            conn.busy_timeout(timeout.unwrap_or_default())?;
            Ok(())
        })
        .await?;
        debug!(?timeout, "busy timeout set");
        Ok(self)
    }

    /// Rows changed by the most recent statement.
    ///
    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub async fn changes(&self) -> Result<usize, LiteDbError> {
        run_blocking(self.shared(), |conn| Ok(conn.changes() as usize)).await
    }

    /// Rows changed since the connection was opened.
    ///
    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub async fn total_changes(&self) -> Result<i64, LiteDbError> {
        run_blocking(self.shared(), |conn| executor::total_changes(conn)).await
    }

    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub async fn last_insert_rowid(&self) -> Result<i64, LiteDbError> {
        run_blocking(self.shared(), |conn| Ok(conn.last_insert_rowid())).await
    }

    /// True while an explicit transaction is open.
    ///
    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub async fn transaction_active(&self) -> Result<bool, LiteDbError> {
        run_blocking(self.shared(), |conn| Ok(!conn.is_autocommit())).await
    }

    /// File backing the named schema (`main` when `None`).
    ///
    /// Returns `None` for in-memory or temporary databases and for unknown schema names.
    ///
    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub async fn filename(&self, schema: Option<&str>) -> Result<Option<String>, LiteDbError> {
        let schema = schema.unwrap_or("main").to_owned();
        run_blocking(self.shared(), move |conn| {
            let file: Option<String> = conn
                .query_row(
                    "select file from pragma_database_list where name = ?1",
                    [&schema],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(file.filter(|f| !f.is_empty()))
        })
        .await
    }

    /// Read a run-time limit, or set it when `new_value` is given.
    ///
    /// Returns the value in effect before the call.
    ///
    /// # Errors
    /// Returns `LiteDbError::InvalidLimitCategory` for an unknown category and
    /// `LiteDbError::ClosedHandle` if the database is closed.
    pub async fn limit(&self, category: i32, new_value: Option<i32>) -> Result<i32, LiteDbError> {
        let limit = limit_category(category)?;
        run_blocking(self.shared(), move |conn| {
            let previous = match new_value {
                Some(value) => conn.set_limit(limit, value),
                None => conn.limit(limit),
            };
            Ok(previous)
        })
        .await
    }
}
