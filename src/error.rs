use thiserror::Error;

use rusqlite::ErrorCode;

#[derive(Debug, Error)]
pub enum LiteDbError {
    #[error("Database is closed")]
    ClosedHandle,

    #[error("SQL error: {message} (extended code {extended_code})")]
    CompileError { extended_code: i32, message: String },

    #[error("Bind error: {0}")]
    BindError(String),

    #[error("Step error: {message} (extended code {extended_code})")]
    StepError { extended_code: i32, message: String },

    #[error("Database is busy: {message} (extended code {extended_code})")]
    Busy { extended_code: i32, message: String },

    #[error("Query interrupted: {message} (extended code {extended_code})")]
    Interrupted { extended_code: i32, message: String },

    #[error("Backup error: {0}")]
    BackupError(String),

    #[error("Invalid limit category: {0}")]
    InvalidLimitCategory(i32),

    #[error("Open error: {0}")]
    OpenError(String),

    #[error("Close error: {0}")]
    CloseError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),
}

/// Which part of the statement pipeline produced an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Compile,
    Bind,
    Step,
}

impl LiteDbError {
    /// Map an engine error onto the taxonomy for the phase it came from.
    ///
    /// Busy/locked and interrupt codes win over the phase so callers can retry
    /// on contention without conflating it with cancellation.
    pub(crate) fn classify(err: rusqlite::Error, phase: Phase) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ffi_err, msg) => {
                let message = msg.unwrap_or_else(|| ffi_err.to_string());
                let extended_code = ffi_err.extended_code;
                match ffi_err.code {
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => LiteDbError::Busy {
                        extended_code,
                        message,
                    },
                    ErrorCode::OperationInterrupted => LiteDbError::Interrupted {
                        extended_code,
                        message,
                    },
                    _ => match phase {
                        Phase::Compile => LiteDbError::CompileError {
                            extended_code,
                            message,
                        },
                        Phase::Bind => LiteDbError::BindError(message),
                        Phase::Step => LiteDbError::StepError {
                            extended_code,
                            message,
                        },
                    },
                }
            }
            rusqlite::Error::InvalidParameterName(name) => {
                LiteDbError::BindError(format!("no such parameter: {name}"))
            }
            rusqlite::Error::InvalidParameterCount(given, expected) => LiteDbError::BindError(
                format!("expected {expected} parameters, got {given}"),
            ),
            rusqlite::Error::ToSqlConversionFailure(e) => LiteDbError::BindError(e.to_string()),
            other => match phase {
                Phase::Bind => LiteDbError::BindError(other.to_string()),
                _ => LiteDbError::SqliteError(other),
            },
        }
    }

    /// True for lock contention reported by the engine.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, LiteDbError::Busy { .. })
    }

    /// True when the statement was cancelled through [`crate::Database::interrupt`].
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, LiteDbError::Interrupted { .. })
    }

    /// The engine's extended result code, when the error came from the engine.
    #[must_use]
    pub fn extended_code(&self) -> Option<i32> {
        match self {
            LiteDbError::CompileError { extended_code, .. }
            | LiteDbError::StepError { extended_code, .. }
            | LiteDbError::Busy { extended_code, .. }
            | LiteDbError::Interrupted { extended_code, .. } => Some(*extended_code),
            LiteDbError::SqliteError(rusqlite::Error::SqliteFailure(err, _)) => {
                Some(err.extended_code)
            }
            _ => None,
        }
    }
}
