use std::sync::Arc;

use rusqlite::Statement;

use crate::database::{Database, run_blocking};
use crate::error::{LiteDbError, Phase};
use crate::executor;
use crate::params::{Params, bind};
use crate::query::{self, FirstColumn, Keyed, Positional};
use crate::results::Record;
use crate::types::Value;

/// Reusable handle to one SQL statement on a [`Database`].
///
/// The text is compiled through the connection's statement cache on each
/// call, so repeated calls skip recompilation. Only the first statement of
/// the SQL given to [`Database::prepare`] is kept.
#[derive(Clone, Debug)]
pub struct PreparedStatement {
    db: Database,
    sql: Arc<String>,
}

impl PreparedStatement {
    pub(crate) fn new(db: Database, sql: String) -> Self {
        Self {
            db,
            sql: Arc::new(sql),
        }
    }

    /// The SQL this statement runs.
    #[must_use]
    pub fn sql(&self) -> &str {
        self.sql.as_str()
    }

    /// # Errors
    /// Returns `LiteDbError` if the database is closed or binding or stepping fails.
    pub async fn query(&self, params: impl Into<Params>) -> Result<Vec<Record>, LiteDbError> {
        self.run(Some(params.into()), query::collect::<Keyed>).await
    }

    /// # Errors
    /// Returns `LiteDbError` if the database is closed or binding or stepping fails.
    pub async fn query_ary(&self, params: impl Into<Params>) -> Result<Vec<Vec<Value>>, LiteDbError> {
        self.run(Some(params.into()), query::collect::<Positional>).await
    }

    /// # Errors
    /// Returns `LiteDbError` if the database is closed or binding or stepping fails.
    pub async fn query_single_value(
        &self,
        params: impl Into<Params>,
    ) -> Result<Option<Value>, LiteDbError> {
        self.run(Some(params.into()), query::first::<FirstColumn>).await
    }

    /// Run the statement once, returning the rows it changed.
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or binding or stepping fails.
    pub async fn execute(&self, params: impl Into<Params>) -> Result<usize, LiteDbError> {
        self.execute_multi([params.into()]).await
    }

    /// Run the statement once per parameter set, returning the rows changed in total.
    ///
    /// # Errors
    /// Returns `LiteDbError` if the database is closed or binding or stepping fails.
    pub async fn execute_multi<I, P>(&self, param_sets: I) -> Result<usize, LiteDbError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Params>,
    {
        let sets: Vec<Params> = param_sets.into_iter().map(Into::into).collect();
        let sql = Arc::clone(&self.sql);
        run_blocking(self.db.shared(), move |conn| {
            let mut stmt = conn
                .prepare_cached(&sql)
                .map_err(|e| LiteDbError::classify(e, Phase::Compile))?;
            let mut total = 0usize;
            for params in &sets {
                bind(&mut *stmt, params)?;
                total += executor::discard_counting(conn, &mut *stmt)?;
            }
            Ok(total)
        })
        .await
    }

    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub async fn columns(&self) -> Result<Vec<String>, LiteDbError> {
        self.run(None, |stmt| Ok(query::column_names(stmt))).await
    }

    async fn run<T, P>(&self, params: Option<Params>, project: P) -> Result<T, LiteDbError>
    where
        P: FnOnce(&mut Statement<'_>) -> Result<T, LiteDbError> + Send + 'static,
        T: Send + 'static,
    {
        let sql = Arc::clone(&self.sql);
        let trace = self.db.trace_hook();
        run_blocking(self.db.shared(), move |conn| {
            if let Some(hook) = &trace {
                hook(&sql);
            }
            let mut stmt = conn
                .prepare_cached(&sql)
                .map_err(|e| LiteDbError::classify(e, Phase::Compile))?;
            if let Some(params) = &params {
                bind(&mut *stmt, params)?;
            }
            project(&mut *stmt)
        })
        .await
    }
}
