use std::time::Duration;

use crate::database::Database;
use crate::error::LiteDbError;

/// Options for opening a [`Database`].
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub path: String,
    /// How long the engine waits on a lock before reporting busy. `None` disables waiting.
    pub busy_timeout: Option<Duration>,
    /// Switch the journal to WAL on open.
    pub wal: bool,
}

impl DatabaseOptions {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Some(Duration::from_secs(5)),
            wal: false,
        }
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Option<Duration>) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    #[must_use]
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }
}

/// Fluent builder for [`DatabaseOptions`].
#[derive(Debug, Clone)]
pub struct DatabaseOptionsBuilder {
    opts: DatabaseOptions,
}

impl DatabaseOptionsBuilder {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            opts: DatabaseOptions::new(path),
        }
    }

    #[must_use]
    pub fn busy_timeout(mut self, busy_timeout: Option<Duration>) -> Self {
        self.opts.busy_timeout = busy_timeout;
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> DatabaseOptions {
        self.opts
    }

    /// Open the database with the collected options.
    ///
    /// # Errors
    ///
    /// Returns `LiteDbError::OpenError` if the engine cannot open the file or apply the options.
    pub async fn open(self) -> Result<Database, LiteDbError> {
        Database::open_with(self.finish()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let opts = DatabaseOptionsBuilder::new("x.db")
            .busy_timeout(None)
            .wal(true)
            .finish();
        assert_eq!(opts.path, "x.db");
        assert_eq!(opts.busy_timeout, None);
        assert!(opts.wal);

        let defaults = DatabaseOptions::new("y.db");
        assert_eq!(defaults.busy_timeout, Some(Duration::from_secs(5)));
        assert!(!defaults.wal);
    }
}
