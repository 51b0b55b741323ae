// Online backup: copy a live database into another one a few pages at a time,
// sleeping and retrying when the source is busy.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::backup::{Backup, StepResult};
use rusqlite::{Connection, DatabaseName};
use serde::Serialize;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

use crate::database::{Database, SharedConnection};
use crate::error::LiteDbError;

/// Pages copied per engine step.
pub const STEP_PAGES: i32 = 16;
/// Pause before retrying a step that hit a busy or locked source.
pub const RETRY_SLEEP: Duration = Duration::from_millis(100);

/// Snapshot handed to the progress observer after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackupProgress {
    pub remaining: i32,
    pub total: i32,
}

/// Where a backup is written.
#[derive(Debug)]
pub enum BackupTarget<'a> {
    /// A file opened for the backup and closed again when it ends.
    Path(PathBuf),
    /// Another open database; it stays open afterwards.
    Database(&'a Database),
}

impl From<PathBuf> for BackupTarget<'_> {
    fn from(path: PathBuf) -> Self {
        BackupTarget::Path(path)
    }
}

impl From<&str> for BackupTarget<'_> {
    fn from(path: &str) -> Self {
        BackupTarget::Path(PathBuf::from(path))
    }
}

impl<'a> From<&'a Database> for BackupTarget<'a> {
    fn from(db: &'a Database) -> Self {
        BackupTarget::Database(db)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BackupState {
    Running,
    RetryWait,
    Done,
    Failed(String),
}

/// Result of one bounded copy step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    More,
    Finished,
    Contended,
    Failed(String),
}

/// The page-copying half of a backup session.
pub(crate) trait PageCopier {
    fn copy_pages(&mut self, pages: i32) -> StepOutcome;
    fn page_progress(&self) -> BackupProgress;
}

impl PageCopier for Backup<'_, '_> {
    fn copy_pages(&mut self, pages: i32) -> StepOutcome {
        match self.step(pages) {
            Ok(StepResult::More) => StepOutcome::More,
            Ok(StepResult::Done) => StepOutcome::Finished,
            Ok(StepResult::Busy | StepResult::Locked) => StepOutcome::Contended,
            Ok(other) => StepOutcome::Failed(format!("unexpected backup step result: {other:?}")),
            Err(err) => StepOutcome::Failed(err.to_string()),
        }
    }

    fn page_progress(&self) -> BackupProgress {
        let progress = self.progress();
        BackupProgress {
            remaining: progress.remaining,
            total: progress.pagecount,
        }
    }
}

/// Drive `copier` until it finishes or fails, reporting progress to `observer`.
///
/// After the last step the observer sees `(total, total)`.
pub(crate) fn run_session<C, F>(
    copier: &mut C,
    retry_sleep: Duration,
    mut observer: F,
) -> Result<(), LiteDbError>
where
    C: PageCopier,
    F: FnMut(BackupProgress),
{
    let mut state = BackupState::Running;
    loop {
        state = match state {
            BackupState::Running => match copier.copy_pages(STEP_PAGES) {
                StepOutcome::More => {
                    let progress = copier.page_progress();
                    debug!(remaining = progress.remaining, total = progress.total, "backup step");
                    observer(progress);
                    BackupState::Running
                }
                StepOutcome::Finished => {
                    let total = copier.page_progress().total;
                    observer(BackupProgress {
                        remaining: total,
                        total,
                    });
                    BackupState::Done
                }
                StepOutcome::Contended => BackupState::RetryWait,
                StepOutcome::Failed(message) => BackupState::Failed(message),
            },
            BackupState::RetryWait => {
                debug!(?retry_sleep, "backup source busy, retrying");
                std::thread::sleep(retry_sleep);
                BackupState::Running
            }
            BackupState::Done => {
                debug!("backup complete");
                return Ok(());
            }
            BackupState::Failed(message) => return Err(LiteDbError::BackupError(message)),
        };
    }
}

fn schema(name: &str) -> DatabaseName<'_> {
    match name {
        "main" => DatabaseName::Main,
        "temp" => DatabaseName::Temp,
        other => DatabaseName::Attached(other),
    }
}

fn copy_database(
    src: &Connection,
    src_schema: &str,
    dst: &mut Connection,
    dst_schema: &str,
    progress: &UnboundedSender<BackupProgress>,
) -> Result<(), LiteDbError> {
    let mut backup = Backup::new_with_names(src, schema(src_schema), dst, schema(dst_schema))
        .map_err(|e| LiteDbError::BackupError(e.to_string()))?;
    run_session(&mut backup, RETRY_SLEEP, |p| {
        // The receiver only goes away if the caller's future was dropped.
        let _ = progress.send(p);
    })
}

fn backup_to_path(
    src: &SharedConnection,
    src_schema: &str,
    path: &Path,
    dst_schema: &str,
    progress: &UnboundedSender<BackupProgress>,
) -> Result<(), LiteDbError> {
    let guard = src.blocking_lock();
    let src_conn = guard.as_ref().ok_or(LiteDbError::ClosedHandle)?;
    let mut dst = Connection::open(path)
        .map_err(|e| LiteDbError::OpenError(format!("{}: {e}", path.display())))?;
    let result = copy_database(src_conn, src_schema, &mut dst, dst_schema, progress);
    if let Err((_, err)) = dst.close() {
        warn!(path = %path.display(), error = %err, "failed to close backup destination");
    }
    result
}

fn backup_to_database(
    src: &SharedConnection,
    src_schema: &str,
    dst: &SharedConnection,
    dst_schema: &str,
    progress: &UnboundedSender<BackupProgress>,
) -> Result<(), LiteDbError> {
    // Lock in address order so two opposing backups cannot deadlock.
    let (src_guard, mut dst_guard) = if Arc::as_ptr(src) < Arc::as_ptr(dst) {
        let s = src.blocking_lock();
        (s, dst.blocking_lock())
    } else {
        let d = dst.blocking_lock();
        (src.blocking_lock(), d)
    };
    let src_conn = src_guard.as_ref().ok_or(LiteDbError::ClosedHandle)?;
    let dst_conn = dst_guard.as_mut().ok_or(LiteDbError::ClosedHandle)?;
    copy_database(src_conn, src_schema, dst_conn, dst_schema, progress)
}

impl Database {
    /// Copy the `main` schema into `target`, calling `progress` with
    /// `(remaining, total)` page counts as the copy advances.
    ///
    /// ```rust,no_run
    /// # use litequery::prelude::*;
    /// # async fn demo(db: &Database) -> Result<(), LiteDbError> {
    /// db.backup(BackupTarget::Path("copy.db".into()), |p| {
    ///     println!("{}/{}", p.total - p.remaining, p.total);
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns `LiteDbError::BackupError` if a step fails, `ClosedHandle` if
    /// either database is closed, and `OpenError` if a path target cannot be opened.
    pub async fn backup<'a, F>(
        &self,
        target: impl Into<BackupTarget<'a>>,
        progress: F,
    ) -> Result<&Self, LiteDbError>
    where
        F: FnMut(BackupProgress),
    {
        self.backup_with_names(target, "main", "main", progress)
            .await
    }

    /// Like [`Database::backup`], naming the source and destination schemas
    /// (`main`, `temp`, or an attached name).
    ///
    /// # Errors
    /// See [`Database::backup`].
    pub async fn backup_with_names<'a, F>(
        &self,
        target: impl Into<BackupTarget<'a>>,
        src_schema: &str,
        dst_schema: &str,
        mut progress: F,
    ) -> Result<&Self, LiteDbError>
    where
        F: FnMut(BackupProgress),
    {
        let src = self.shared();
        let src_schema = src_schema.to_owned();
        let dst_schema = dst_schema.to_owned();
        let (tx, mut rx) = unbounded_channel();

        let worker = match target.into() {
            BackupTarget::Path(path) => {
                debug!(path = %path.display(), %src_schema, %dst_schema, "starting backup");
                tokio::task::spawn_blocking(move || {
                    backup_to_path(&src, &src_schema, &path, &dst_schema, &tx)
                })
            }
            BackupTarget::Database(dst) => {
                if self.same_connection(dst) {
                    return Err(LiteDbError::BackupError(
                        "source and destination are the same database".into(),
                    ));
                }
                debug!(dst = %dst.path(), %src_schema, %dst_schema, "starting backup");
                let dst = dst.shared();
                tokio::task::spawn_blocking(move || {
                    backup_to_database(&src, &src_schema, &dst, &dst_schema, &tx)
                })
            }
        };

        while let Some(p) = rx.recv().await {
            progress(p);
        }
        worker.await.map_err(|e| {
            LiteDbError::ExecutionError(format!("sqlite spawn_blocking join error: {e}"))
        })??;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    struct ScriptedCopier {
        outcomes: VecDeque<StepOutcome>,
        remaining: i32,
        total: i32,
        steps: usize,
    }

    impl ScriptedCopier {
        fn new(total: i32, outcomes: Vec<StepOutcome>) -> Self {
            Self {
                outcomes: outcomes.into(),
                remaining: total,
                total,
                steps: 0,
            }
        }
    }

    impl PageCopier for ScriptedCopier {
        fn copy_pages(&mut self, pages: i32) -> StepOutcome {
            self.steps += 1;
            let outcome = self
                .outcomes
                .pop_front()
                .unwrap_or(StepOutcome::Failed("script exhausted".into()));
            if matches!(outcome, StepOutcome::More | StepOutcome::Finished) {
                self.remaining = (self.remaining - pages).max(0);
            }
            outcome
        }

        fn page_progress(&self) -> BackupProgress {
            BackupProgress {
                remaining: self.remaining,
                total: self.total,
            }
        }
    }

    #[test]
    fn reports_each_step_then_total_on_completion() {
        let mut copier = ScriptedCopier::new(
            40,
            vec![StepOutcome::More, StepOutcome::More, StepOutcome::Finished],
        );
        let mut seen = Vec::new();
        run_session(&mut copier, Duration::ZERO, |p| seen.push((p.remaining, p.total))).unwrap();
        assert_eq!(seen, vec![(24, 40), (8, 40), (40, 40)]);
    }

    #[test]
    fn busy_and_locked_steps_are_retried_without_progress() {
        let mut copier = ScriptedCopier::new(
            16,
            vec![
                StepOutcome::Contended,
                StepOutcome::Contended,
                StepOutcome::Finished,
            ],
        );
        let mut seen = Vec::new();
        run_session(&mut copier, Duration::ZERO, |p| seen.push(p)).unwrap();
        assert_eq!(copier.steps, 3);
        assert_eq!(
            seen,
            vec![BackupProgress {
                remaining: 16,
                total: 16
            }]
        );
    }

    #[test]
    fn failed_step_surfaces_engine_message() {
        let mut copier = ScriptedCopier::new(
            32,
            vec![StepOutcome::More, StepOutcome::Failed("disk I/O error".into())],
        );
        let mut calls = 0;
        let err = run_session(&mut copier, Duration::ZERO, |_| calls += 1).unwrap_err();
        assert!(matches!(err, LiteDbError::BackupError(ref m) if m == "disk I/O error"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn schema_names_map_to_engine_names() {
        assert!(matches!(schema("main"), DatabaseName::Main));
        assert!(matches!(schema("temp"), DatabaseName::Temp));
        assert!(matches!(schema("aux"), DatabaseName::Attached("aux")));
    }

    #[test]
    fn real_backup_copies_rows() -> Result<(), LiteDbError> {
        let src = Connection::open_in_memory()?;
        src.execute_batch("create table t(x); insert into t values (1), (2), (3);")?;
        let mut dst = Connection::open_in_memory()?;
        let (tx, mut rx) = unbounded_channel();
        copy_database(&src, "main", &mut dst, "main", &tx)?;
        drop(tx);
        let mut last = None;
        while let Ok(p) = rx.try_recv() {
            last = Some(p);
        }
        let last = last.expect("final progress");
        assert_eq!(last.remaining, last.total);
        let count: i64 = dst.query_row("select count(*) from t", [], |r| r.get(0))?;
        assert_eq!(count, 3);
        Ok(())
    }
}
