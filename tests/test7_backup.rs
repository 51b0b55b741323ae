use litequery::prelude::*;
use tempfile::TempDir;

async fn populated(rows: i64) -> Result<Database, LiteDbError> {
    let db = Database::open_in_memory().await?;
    db.execute(
        "create table t (x); \
         insert into t select randomblob(2000) from \
         (with recursive c(i) as (select 1 union all select i + 1 from c where i < ?) select i from c)",
        vec![Value::Int(rows)],
    )
    .await?;
    Ok(db)
}

fn assert_progress_shape(progress: &[BackupProgress]) {
    let (last, steps) = progress.split_last().expect("at least one progress report");
    assert_eq!(last.remaining, last.total);
    assert!(last.total > 0);
    for pair in steps.windows(2) {
        assert!(pair[1].remaining <= pair[0].remaining, "{progress:?}");
    }
    for p in steps {
        assert_eq!(p.total, last.total);
        assert!(p.remaining < p.total);
    }
}

#[tokio::test]
async fn backup_between_handles_reports_progress() -> Result<(), LiteDbError> {
    let src = populated(300).await?;
    let dst = Database::open_in_memory().await?;

    let mut progress = Vec::new();
    src.backup(&dst, |p| progress.push(p)).await?;

    assert!(progress.len() > 2, "expected several steps, got {progress:?}");
    assert_progress_shape(&progress);
    assert!(!dst.is_closed());
    let count = dst.query_single_value("select count(*) from t", ()).await?;
    assert_eq!(count, Some(Value::Int(300)));
    Ok(())
}

#[tokio::test]
async fn backup_to_path_opens_and_closes_the_destination() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("copy.db");
    let src = populated(50).await?;

    let mut progress = Vec::new();
    src.backup(BackupTarget::Path(path.clone()), |p| progress.push(p))
        .await?;
    assert_progress_shape(&progress);

    let copy = Database::open(path.to_str().ok_or("non-utf8 temp path")?).await?;
    let count = copy.query_single_value("select count(*) from t", ()).await?;
    assert_eq!(count, Some(Value::Int(50)));
    Ok(())
}

#[tokio::test]
async fn backup_with_names_copies_an_attached_schema() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let aux_path = dir.path().join("aux.db");
    let aux = Database::open(aux_path.to_str().ok_or("non-utf8 temp path")?).await?;
    aux.execute("create table a (v); insert into a values ('attached')", ())
        .await?;
    aux.close().await?;

    let src = Database::open_in_memory().await?;
    src.execute(
        "attach database ? as aux",
        vec![Value::from(aux_path.to_str().ok_or("non-utf8 temp path")?)],
    )
    .await?;
    let dst = Database::open_in_memory().await?;
    src.backup_with_names(&dst, "aux", "main", |_| {}).await?;

    let v = dst.query_single_value("select v from a", ()).await?;
    assert_eq!(v, Some(Value::Text("attached".into())));
    Ok(())
}

#[tokio::test]
async fn backup_onto_itself_is_rejected() -> Result<(), LiteDbError> {
    let db = populated(1).await?;
    let same = db.clone();
    let err = db.backup(&same, |_| {}).await.unwrap_err();
    assert!(matches!(err, LiteDbError::BackupError(_)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn backup_from_an_unknown_schema_fails() -> Result<(), LiteDbError> {
    let src = populated(1).await?;
    let dst = Database::open_in_memory().await?;
    let err = src
        .backup_with_names(&dst, "nope", "main", |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, LiteDbError::BackupError(_)), "{err:?}");
    assert!(!dst.is_closed());
    Ok(())
}
