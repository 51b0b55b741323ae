use crate::error::LiteDbError;
use crate::params::Params;
use crate::query::{self, FirstColumn, Keyed, Positional};
use crate::results::Record;
use crate::types::Value;

use super::Database;

impl Database {
    /// Run a query and return every row as a [`Record`] keyed by column name.
    ///
    /// Parameters bind by position (`?`) or by name (`:name`); a name may be
    /// given with or without its sigil:
    /// ```rust,no_run
    /// # use litequery::prelude::*;
    /// # async fn demo(db: &Database) -> Result<(), LiteDbError> {
    /// db.query("select * from foo where x = ?", vec![Value::Int(42)]).await?;
    /// db.query("select * from foo where x = :bar", Params::named([("bar", 42)])).await?;
    /// db.query("select * from foo where x = :bar", Params::named([(":bar", 42)])).await?;
    /// # Ok(())
    /// # }
    /// ```
    /// Several `;`-separated statements run in order; the rows of the last one are returned.
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or compiling, binding or stepping fails.
    pub async fn query(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> Result<Vec<Record>, LiteDbError> {
        Ok(self
            .perform(sql, Some(params.into()), query::collect::<Keyed>)
            .await?
            .unwrap_or_default())
    }

    /// Alias for [`Database::query`].
    ///
    /// # Errors
    /// See [`Database::query`].
    pub async fn query_hash(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> Result<Vec<Record>, LiteDbError> {
        self.query(sql, params).await
    }

    /// Run a query and hand each [`Record`] to `sink` as it is fetched.
    ///
    /// `sink` runs on the blocking worker between fetch steps. Returning `Err`
    /// stops the iteration; the statement is finalized and the error returned.
    ///
    /// # Errors
    /// Returns `LiteDbError` from the engine or from `sink`.
    pub async fn query_each<F>(
        &self,
        sql: &str,
        params: impl Into<Params>,
        sink: F,
    ) -> Result<&Self, LiteDbError>
    where
        F: FnMut(Record) -> Result<(), LiteDbError> + Send + 'static,
    {
        self.perform(sql, Some(params.into()), move |stmt| {
            query::drain::<Keyed, _>(stmt, sink)
        })
        .await?;
        Ok(self)
    }

    /// Run a query and return every row as a positional list of values.
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or compiling, binding or stepping fails.
    pub async fn query_ary(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> Result<Vec<Vec<Value>>, LiteDbError> {
        Ok(self
            .perform(sql, Some(params.into()), query::collect::<Positional>)
            .await?
            .unwrap_or_default())
    }

    /// Streaming form of [`Database::query_ary`].
    ///
    /// # Errors
    /// Returns `LiteDbError` from the engine or from `sink`.
    pub async fn query_ary_each<F>(
        &self,
        sql: &str,
        params: impl Into<Params>,
        sink: F,
    ) -> Result<&Self, LiteDbError>
    where
        F: FnMut(Vec<Value>) -> Result<(), LiteDbError> + Send + 'static,
    {
        self.perform(sql, Some(params.into()), move |stmt| {
            query::drain::<Positional, _>(stmt, sink)
        })
        .await?;
        Ok(self)
    }

    /// Return the first row as a [`Record`], or `None` when there are no rows.
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or compiling, binding or stepping fails.
    pub async fn query_single_row(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> Result<Option<Record>, LiteDbError> {
        Ok(self
            .perform(sql, Some(params.into()), query::first::<Keyed>)
            .await?
            .flatten())
    }

    /// Return the first column of every row.
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or compiling, binding or stepping fails.
    pub async fn query_single_column(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> Result<Vec<Value>, LiteDbError> {
        Ok(self
            .perform(sql, Some(params.into()), query::collect::<FirstColumn>)
            .await?
            .unwrap_or_default())
    }

    /// Streaming form of [`Database::query_single_column`].
    ///
    /// # Errors
    /// Returns `LiteDbError` from the engine or from `sink`.
    pub async fn query_single_column_each<F>(
        &self,
        sql: &str,
        params: impl Into<Params>,
        sink: F,
    ) -> Result<&Self, LiteDbError>
    where
        F: FnMut(Value) -> Result<(), LiteDbError> + Send + 'static,
    {
        self.perform(sql, Some(params.into()), move |stmt| {
            query::drain::<FirstColumn, _>(stmt, sink)
        })
        .await?;
        Ok(self)
    }

    /// Return the first column of the first row, or `None` when there are no rows.
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or compiling, binding or stepping fails.
    pub async fn query_single_value(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> Result<Option<Value>, LiteDbError> {
        Ok(self
            .perform(sql, Some(params.into()), query::first::<FirstColumn>)
            .await?
            .flatten())
    }

    /// Column names the query would return, without running it.
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or the SQL does not compile.
    pub async fn columns(&self, sql: &str) -> Result<Vec<String>, LiteDbError> {
        Ok(self
            .perform(sql, None, |stmt| Ok(query::column_names(stmt)))
            .await?
            .unwrap_or_default())
    }
}
