use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use rusqlite::{Connection, InterruptHandle, Statement};
use tracing::debug;

use crate::config::{DatabaseOptions, DatabaseOptionsBuilder};
use crate::error::LiteDbError;
use crate::executor::{self, TraceHook};
use crate::params::Params;

/// Engine connection shared with blocking workers; `None` once closed.
pub(crate) type SharedConnection = Arc<tokio::sync::Mutex<Option<Connection>>>;

struct DatabaseInner {
    conn: SharedConnection,
    interrupt: Mutex<Option<InterruptHandle>>,
    trace: RwLock<Option<TraceHook>>,
    closed: AtomicBool,
    path: String,
}

/// Async handle to one SQLite connection.
///
/// Clones share the same connection. Engine calls run on the blocking pool and
/// are serialized by the connection mutex, so only one statement is in flight
/// per connection at a time.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Open (or create) the database at `path` with default options.
    ///
    /// # Errors
    /// Returns `LiteDbError::OpenError` if the engine cannot open the file.
    pub async fn open(path: impl Into<String>) -> Result<Self, LiteDbError> {
        Self::open_with(DatabaseOptions::new(path)).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns `LiteDbError::OpenError` if the engine cannot allocate the database.
    pub async fn open_in_memory() -> Result<Self, LiteDbError> {
        Self::open(":memory:").await
    }

    #[must_use]
    pub fn builder(path: impl Into<String>) -> DatabaseOptionsBuilder {
        DatabaseOptionsBuilder::new(path)
    }

    /// Open the database described by `opts`.
    ///
    /// # Errors
    /// Returns `LiteDbError::OpenError` if opening fails or an option cannot be applied.
    pub async fn open_with(opts: DatabaseOptions) -> Result<Self, LiteDbError> {
        let path = opts.path.clone();
        let conn = tokio::task::spawn_blocking(move || open_connection(&opts))
            .await
            .map_err(|e| {
                LiteDbError::ExecutionError(format!("sqlite spawn_blocking join error: {e}"))
            })??;
        let interrupt = conn.get_interrupt_handle();
        debug!(path = %path, "opened database");

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                conn: Arc::new(tokio::sync::Mutex::new(Some(conn))),
                interrupt: Mutex::new(Some(interrupt)),
                trace: RwLock::new(None),
                closed: AtomicBool::new(false),
                path,
            }),
        })
    }

    /// Close the connection. Closing an already closed database does nothing.
    ///
    /// If the engine refuses to close, the connection stays open and usable.
    ///
    /// # Errors
    /// Returns `LiteDbError::CloseError` with the engine's message.
    pub async fn close(&self) -> Result<(), LiteDbError> {
        let shared = self.shared();
        tokio::task::spawn_blocking(move || {
            let mut guard = shared.blocking_lock();
            let Some(conn) = guard.take() else {
                return Ok(());
            };
            match conn.close() {
                Ok(()) => Ok(()),
                Err((conn, err)) => {
                    *guard = Some(conn);
                    Err(LiteDbError::CloseError(err.to_string()))
                }
            }
        })
        .await
        .map_err(|e| {
            LiteDbError::ExecutionError(format!("sqlite spawn_blocking join error: {e}"))
        })??;

        self.inner.closed.store(true, Ordering::SeqCst);
        if let Ok(mut handle) = self.inner.interrupt.lock() {
            handle.take();
        }
        debug!(path = %self.inner.path, "closed database");
        Ok(())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Abort the statement currently running on this connection.
    ///
    /// Safe to call from any task or thread; the interrupted call fails with
    /// `LiteDbError::Interrupted`.
    ///
    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub fn interrupt(&self) -> Result<&Self, LiteDbError> {
        let guard = self.inner.interrupt.lock().map_err(|err| {
            LiteDbError::ExecutionError(format!("interrupt handle mutex poisoned: {err}"))
        })?;
        let handle = guard.as_ref().ok_or(LiteDbError::ClosedHandle)?;
        handle.interrupt();
        Ok(self)
    }

    /// Install a trace hook, replacing any previous one.
    ///
    /// The hook receives the stripped SQL text of every top-level query or
    /// execute call, before it is prepared.
    ///
    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub fn trace<F>(&self, hook: F) -> Result<&Self, LiteDbError>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.set_trace_hook(Some(Arc::new(hook) as TraceHook))
    }

    /// Remove the trace hook.
    ///
    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed.
    pub fn clear_trace(&self) -> Result<&Self, LiteDbError> {
        self.set_trace_hook(None)
    }

    fn set_trace_hook(&self, hook: Option<TraceHook>) -> Result<&Self, LiteDbError> {
        if self.is_closed() {
            return Err(LiteDbError::ClosedHandle);
        }
        let mut slot = self.inner.trace.write().map_err(|err| {
            LiteDbError::ExecutionError(format!("trace hook lock poisoned: {err}"))
        })?;
        *slot = hook;
        Ok(self)
    }

    /// Path the database was opened with.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Run synchronous `rusqlite` logic against the open connection.
    ///
    /// # Errors
    /// Returns `LiteDbError::ClosedHandle` if the database is closed, or whatever `func` returns.
    pub async fn with_connection<F, R>(&self, func: F) -> Result<R, LiteDbError>
    where
        F: FnOnce(&mut Connection) -> Result<R, LiteDbError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(self.shared(), func).await
    }

    pub(crate) fn shared(&self) -> SharedConnection {
        Arc::clone(&self.inner.conn)
    }

    pub(crate) fn same_connection(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn trace_hook(&self) -> Option<TraceHook> {
        self.inner.trace.read().ok().and_then(|slot| slot.clone())
    }

    /// Strip, prepare, bind and project `sql` on the blocking pool.
    ///
    /// Blank SQL returns `Ok(None)` without touching the engine, even on a
    /// closed database.
    pub(crate) async fn perform<T, P>(
        &self,
        sql: &str,
        params: Option<Params>,
        project: P,
    ) -> Result<Option<T>, LiteDbError>
    where
        P: FnOnce(&mut Statement<'_>) -> Result<T, LiteDbError> + Send + 'static,
        T: Send + 'static,
    {
        let sql = sql.trim();
        if sql.is_empty() {
            return Ok(None);
        }
        let sql_owned = sql.to_owned();
        let trace = self.trace_hook();
        run_blocking(self.shared(), move |conn| {
            executor::perform(conn, &sql_owned, params.as_ref(), trace.as_ref(), project)
        })
        .await
    }

    /// Like [`Database::perform`], returning the rows changed by each statement of
    /// the chain, summed. Rows written by triggers are not included.
    pub(crate) async fn perform_counting(
        &self,
        sql: &str,
        params: Params,
    ) -> Result<usize, LiteDbError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Ok(0);
        }
        let sql_owned = sql.to_owned();
        let trace = self.trace_hook();
        run_blocking(self.shared(), move |conn| {
            executor::execute(conn, &sql_owned, &params, trace.as_ref())
        })
        .await
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.inner.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn open_connection(opts: &DatabaseOptions) -> Result<Connection, LiteDbError> {
    let conn = Connection::open(&opts.path)
        .map_err(|e| LiteDbError::OpenError(format!("{}: {e}", opts.path)))?;
    conn.busy_timeout(opts.busy_timeout.unwrap_or_default())
        .map_err(|e| LiteDbError::OpenError(format!("failed to set busy timeout: {e}")))?;
    if opts.wal {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| LiteDbError::OpenError(format!("failed to enable WAL: {e}")))?;
    }
    Ok(conn)
}

/// Run `func` against the open connection on the blocking pool.
///
/// # Errors
/// Returns `LiteDbError::ClosedHandle` if the connection was closed, or
/// `LiteDbError::ExecutionError` if the worker panicked.
pub(crate) async fn run_blocking<F, R>(conn: SharedConnection, func: F) -> Result<R, LiteDbError>
where
    F: FnOnce(&mut Connection) -> Result<R, LiteDbError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        let conn = guard.as_mut().ok_or(LiteDbError::ClosedHandle)?;
        func(conn)
    })
    .await
    .map_err(|e| LiteDbError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}
