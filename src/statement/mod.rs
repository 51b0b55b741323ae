// Statement preparation: compile the first statement of a SQL blob, optionally
// handing back the text that follows it so chained statements can run in turn.

mod scanner;

use rusqlite::{Batch, Connection, Statement};

use crate::error::{LiteDbError, Phase};

pub(crate) use scanner::split_first;

const SQLITE_ERROR: i32 = 1;

/// The first meaningful statement in `sql`, if there is one.
#[must_use]
pub fn first_statement(sql: &str) -> Option<&str> {
    split_first(sql.trim()).map(|(stmt, _)| stmt)
}

/// Compile only the first statement in `sql`; anything after it is ignored.
///
/// Returns `Ok(None)` when `sql` holds nothing but whitespace and comments.
///
/// # Errors
/// Returns `LiteDbError::CompileError` (or `Busy`) when the engine rejects the statement.
pub fn prepare_single<'conn>(
    conn: &'conn Connection,
    sql: &str,
) -> Result<Option<Statement<'conn>>, LiteDbError> {
    match first_statement(sql) {
        Some(text) => compile(conn, text).map(Some),
        None => Ok(None),
    }
}

/// Compile the first statement in `sql` and return the remaining SQL, if it
/// holds at least one more statement.
///
/// Callers run the returned statement to completion before feeding the
/// remainder back in, so later statements can see the effects of earlier ones.
///
/// # Errors
/// Returns `LiteDbError::CompileError` (or `Busy`) when the engine rejects the statement.
pub fn prepare_multi<'conn, 'sql>(
    conn: &'conn Connection,
    sql: &'sql str,
) -> Result<Option<(Statement<'conn>, Option<&'sql str>)>, LiteDbError> {
    let Some((text, rest)) = split_first(sql.trim()) else {
        return Ok(None);
    };
    let stmt = compile(conn, text)?;
    let rest = split_first(rest).map(|_| rest);
    Ok(Some((stmt, rest)))
}

/// Compile one statement's text, checking that the engine reads it as exactly one statement.
pub(crate) fn compile<'conn>(
    conn: &'conn Connection,
    text: &str,
) -> Result<Statement<'conn>, LiteDbError> {
    let mut batch = Batch::new(conn, text);
    let stmt = batch
        .next()
        .map_err(|e| LiteDbError::classify(e, Phase::Compile))?
        .ok_or_else(|| no_statement(text))?;
    match batch.next() {
        Ok(None) => Ok(stmt),
        _ => Err(LiteDbError::CompileError {
            extended_code: SQLITE_ERROR,
            message: format!("statement boundary not recognized in: {text}"),
        }),
    }
}

/// Error for SQL that holds nothing but whitespace and comments.
pub(crate) fn no_statement(sql: &str) -> LiteDbError {
    LiteDbError::CompileError {
        extended_code: SQLITE_ERROR,
        message: format!("no statement to prepare: {sql:?}"),
    }
}
