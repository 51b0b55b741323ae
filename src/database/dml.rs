use crate::error::{LiteDbError, Phase};
use crate::executor;
use crate::params::Params;
use crate::prepared::PreparedStatement;
use crate::statement;

use super::{Database, run_blocking};

impl Database {
    /// Run one or more `;`-separated statements, discarding any rows.
    ///
    /// Returns the number of rows changed across all of them.
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or compiling, binding or stepping fails.
    pub async fn execute(&self, sql: &str, params: impl Into<Params>) -> Result<usize, LiteDbError> {
        self.perform_counting(sql, params.into()).await
    }

    /// Run the first statement of `sql` once per parameter set.
    ///
    /// ```rust,no_run
    /// # use litequery::prelude::*;
    /// # async fn demo(db: &Database) -> Result<(), LiteDbError> {
    /// let records = vec![
    ///     vec![Value::Int(1), Value::Int(2), Value::Int(3)],
    ///     vec![Value::Int(4), Value::Int(5), Value::Int(6)],
    /// ];
    /// let changed = db.execute_multi("insert into foo values (?, ?, ?)", records).await?;
    /// assert_eq!(changed, 2);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or compiling, binding or stepping fails.
    pub async fn execute_multi<I, P>(&self, sql: &str, param_sets: I) -> Result<usize, LiteDbError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Params>,
    {
        let sql = sql.trim();
        if sql.is_empty() {
            return Ok(0);
        }
        let sql_owned = sql.to_owned();
        let sets: Vec<Params> = param_sets.into_iter().map(Into::into).collect();
        run_blocking(self.shared(), move |conn| {
            executor::execute_multi(conn, &sql_owned, &sets)
        })
        .await
    }

    /// Compile `sql` once and return a reusable handle to it.
    ///
    /// # Errors
    /// Returns `LiteDbError::CompileError` if `sql` holds no statement or does not
    /// compile, and `LiteDbError::ClosedHandle` if the database is closed.
    pub async fn prepare(&self, sql: &str) -> Result<PreparedStatement, LiteDbError> {
        let text = statement::first_statement(sql)
            .ok_or_else(|| statement::no_statement(sql))?
            .to_owned();
        let check = text.clone();
        run_blocking(self.shared(), move |conn| {
            conn.prepare_cached(&check)
                .map_err(|e| LiteDbError::classify(e, Phase::Compile))?;
            Ok(())
        })
        .await?;
        Ok(PreparedStatement::new(self.clone(), text))
    }
}
