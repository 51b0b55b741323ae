use rusqlite::{Row, Statement};

use crate::error::{LiteDbError, Phase};
use crate::results::{ColumnIndex, Record};
use crate::types::Value;

fn step_error(err: rusqlite::Error) -> LiteDbError {
    LiteDbError::classify(err, Phase::Step)
}

/// Extract a [`Value`] from column `idx` of a fetched row.
///
/// # Errors
/// Returns `LiteDbError::StepError` if the column cannot be read.
pub fn extract_value(row: &Row<'_>, idx: usize) -> Result<Value, LiteDbError> {
    row.get_ref(idx)
        .map(Value::from_value_ref)
        .map_err(step_error)
}

/// How one fetched row is turned into an output item.
///
/// A shape is built once per statement, so per-statement work (column names)
/// is not repeated per row.
pub trait RowShape: Sized {
    type Item: Send + 'static;

    fn for_statement(stmt: &Statement<'_>) -> Self;

    /// # Errors
    /// Returns `LiteDbError` if a column cannot be read.
    fn build(&self, row: &Row<'_>) -> Result<Self::Item, LiteDbError>;
}

/// Rows as [`Record`]s keyed by column name.
pub struct Keyed {
    columns: ColumnIndex,
}

impl RowShape for Keyed {
    type Item = Record;

    fn for_statement(stmt: &Statement<'_>) -> Self {
        let names = stmt
            .column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        Self {
            columns: ColumnIndex::new(names),
        }
    }

    fn build(&self, row: &Row<'_>) -> Result<Record, LiteDbError> {
        let mut values = Vec::with_capacity(self.columns.len());
        for i in 0..self.columns.len() {
            values.push(extract_value(row, i)?);
        }
        Ok(Record::new(self.columns.clone(), values))
    }
}

/// Rows as positional value lists.
pub struct Positional {
    column_count: usize,
}

impl RowShape for Positional {
    type Item = Vec<Value>;

    fn for_statement(stmt: &Statement<'_>) -> Self {
        Self {
            column_count: stmt.column_count(),
        }
    }

    fn build(&self, row: &Row<'_>) -> Result<Vec<Value>, LiteDbError> {
        (0..self.column_count)
            .map(|i| extract_value(row, i))
            .collect()
    }
}

/// Only the first column of each row.
pub struct FirstColumn;

impl RowShape for FirstColumn {
    type Item = Value;

    fn for_statement(_stmt: &Statement<'_>) -> Self {
        FirstColumn
    }

    fn build(&self, row: &Row<'_>) -> Result<Value, LiteDbError> {
        extract_value(row, 0)
    }
}

/// Step through every row, handing each item to `sink` as soon as it is fetched.
///
/// An error from `sink` stops the iteration and is returned as-is.
///
/// # Errors
/// Returns `LiteDbError` if a step fails, a column cannot be read, or `sink` fails.
pub fn drain<S, F>(stmt: &mut Statement<'_>, mut sink: F) -> Result<(), LiteDbError>
where
    S: RowShape,
    F: FnMut(S::Item) -> Result<(), LiteDbError>,
{
    let shape = S::for_statement(stmt);
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next().map_err(step_error)? {
        sink(shape.build(row)?)?;
    }
    Ok(())
}

/// Collect every row in result order.
///
/// # Errors
/// Returns `LiteDbError` if a step fails or a column cannot be read.
pub fn collect<S: RowShape>(stmt: &mut Statement<'_>) -> Result<Vec<S::Item>, LiteDbError> {
    let mut items = Vec::new();
    drain::<S, _>(stmt, |item| {
        items.push(item);
        Ok(())
    })?;
    Ok(items)
}

/// Fetch the first row only; the statement is not stepped past it.
///
/// # Errors
/// Returns `LiteDbError` if the step fails or a column cannot be read.
pub fn first<S: RowShape>(stmt: &mut Statement<'_>) -> Result<Option<S::Item>, LiteDbError> {
    let shape = S::for_statement(stmt);
    let mut rows = stmt.raw_query();
    match rows.next().map_err(step_error)? {
        Some(row) => shape.build(row).map(Some),
        None => Ok(None),
    }
}

/// Column names of a prepared statement, without stepping it.
#[must_use]
pub fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect()
}

/// Run a statement to completion, discarding any rows it yields.
///
/// # Errors
/// Returns `LiteDbError` if any step fails.
pub fn discard(stmt: &mut Statement<'_>) -> Result<(), LiteDbError> {
    let mut rows = stmt.raw_query();
    while rows.next().map_err(step_error)?.is_some() {}
    Ok(())
}
