use std::sync::Arc;

use rusqlite::{Connection, Statement};
use tracing::debug;

use crate::error::LiteDbError;
use crate::params::{Params, bind};
use crate::query::discard;
use crate::statement::{prepare_multi, prepare_single};

/// Observer invoked with the stripped SQL text before each top-level execution.
pub type TraceHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Prepare, bind and project `sql`, running any chained statements first.
///
/// Every statement but the last is executed without parameters and its rows
/// are discarded; the last one is bound with `params` (skipped when `None`)
/// and handed to `project`. Each statement handle is finalized when it goes
/// out of scope, on success, on error, and on an early return from `project`.
///
/// Returns `Ok(None)` when `sql` contains no statement.
///
/// # Errors
/// Returns `LiteDbError` from compilation, binding, stepping or `project`.
pub fn perform<T, P>(
    conn: &Connection,
    sql: &str,
    params: Option<&Params>,
    trace: Option<&TraceHook>,
    project: P,
) -> Result<Option<T>, LiteDbError>
where
    P: FnOnce(&mut Statement<'_>) -> Result<T, LiteDbError>,
{
    run_chain(conn, sql, params, trace, |stmt| discard(stmt), project)
}

/// Run every statement in `sql`, binding `params` to the last, and sum the
/// rows each one changed.
///
/// Rows written by triggers are not counted.
///
/// # Errors
/// Returns `LiteDbError` from compilation, binding or stepping.
pub fn execute(
    conn: &Connection,
    sql: &str,
    params: &Params,
    trace: Option<&TraceHook>,
) -> Result<usize, LiteDbError> {
    let mut chained = 0usize;
    let last = run_chain(
        conn,
        sql,
        Some(params),
        trace,
        |stmt| {
            chained += discard_counting(conn, stmt)?;
            Ok(())
        },
        |stmt| discard_counting(conn, stmt),
    )?;
    let total = chained + last.unwrap_or(0);
    debug!(total, "execute");
    Ok(total)
}

fn run_chain<T, C, P>(
    conn: &Connection,
    sql: &str,
    params: Option<&Params>,
    trace: Option<&TraceHook>,
    mut chained: C,
    project: P,
) -> Result<Option<T>, LiteDbError>
where
    C: FnMut(&mut Statement<'_>) -> Result<(), LiteDbError>,
    P: FnOnce(&mut Statement<'_>) -> Result<T, LiteDbError>,
{
    let sql = sql.trim();
    if sql.is_empty() {
        return Ok(None);
    }
    if let Some(hook) = trace {
        hook(sql);
    }
    debug!(sql, "perform");

    let mut remaining = sql;
    loop {
        let Some((mut stmt, rest)) = prepare_multi(conn, remaining)? else {
            return Ok(None);
        };
        match rest {
            Some(rest) => {
                debug!(statement = stmt.expanded_sql().as_deref(), "chained statement");
                chained(&mut stmt)?;
                remaining = rest;
            }
            None => {
                if let Some(params) = params {
                    bind(&mut stmt, params)?;
                }
                return project(&mut stmt).map(Some);
            }
        }
    }
}

/// Step `stmt` to completion and return the rows it changed.
///
/// `changes()` keeps its previous value across statements that write no rows
/// (DDL, queries), so it only counts when the connection's running total moved.
pub(crate) fn discard_counting(
    conn: &Connection,
    stmt: &mut Statement<'_>,
) -> Result<usize, LiteDbError> {
    let before = total_changes(conn)?;
    discard(stmt)?;
    if total_changes(conn)? == before {
        return Ok(0);
    }
    Ok(conn.changes() as usize)
}

/// Run the first statement of `sql` once per parameter set and sum the rows changed.
///
/// The statement is compiled once, rebound for every set and stepped to
/// completion; rows it yields are discarded.
///
/// # Errors
/// Returns `LiteDbError` from compilation, binding or stepping; the statement
/// is finalized before the error propagates.
pub fn execute_multi(
    conn: &Connection,
    sql: &str,
    param_sets: &[Params],
) -> Result<usize, LiteDbError> {
    let Some(mut stmt) = prepare_single(conn, sql)? else {
        return Ok(0);
    };
    let mut total = 0usize;
    for params in param_sets {
        bind(&mut stmt, params)?;
        total += discard_counting(conn, &mut stmt)?;
    }
    debug!(sets = param_sets.len(), total, "execute_multi");
    Ok(total)
}

/// Total rows changed on this connection since it was opened.
pub(crate) fn total_changes(conn: &Connection) -> Result<i64, LiteDbError> {
    conn.query_row("select total_changes()", [], |row| row.get(0))
        .map_err(LiteDbError::SqliteError)
}
