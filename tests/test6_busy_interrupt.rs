use std::time::Duration;

use litequery::prelude::*;
use tempfile::TempDir;

#[tokio::test]
async fn lock_contention_is_reported_as_busy() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("busy.db");
    let path = path.to_str().ok_or("non-utf8 temp path")?;

    let writer = Database::open(path).await?;
    writer.execute("create table t (x); insert into t values (1)", ()).await?;
    writer.execute("begin exclusive", ()).await?;
    assert!(writer.transaction_active().await?);

    let reader = Database::builder(path).busy_timeout(None).open().await?;
    let err = reader.query("select * from t", ()).await.unwrap_err();
    assert!(err.is_busy(), "{err:?}");
    assert!(!err.is_interrupted());

    writer.execute("commit", ()).await?;
    assert!(!writer.transaction_active().await?);
    let rows = reader.query_single_column("select x from t", ()).await?;
    assert_eq!(rows, vec![Value::Int(1)]);
    Ok(())
}

#[tokio::test]
async fn busy_timeout_can_be_changed_at_runtime() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("busy2.db");
    let path = path.to_str().ok_or("non-utf8 temp path")?;

    let writer = Database::open(path).await?;
    writer.execute("create table t (x)", ()).await?;
    writer.execute("begin exclusive", ()).await?;

    let reader = Database::open(path).await?;
    reader.set_busy_timeout(Some(Duration::from_millis(50))).await?;
    let err = reader.query("select * from t", ()).await.unwrap_err();
    assert!(err.is_busy(), "{err:?}");
    writer.execute("rollback", ()).await?;
    Ok(())
}

#[tokio::test]
async fn interrupt_cancels_a_running_query() -> Result<(), LiteDbError> {
    let db = Database::open_in_memory().await?;
    let runner = db.clone();
    let task = tokio::spawn(async move {
        runner
            .query_single_value(
                "with recursive c(i) as (select 1 union all select i + 1 from c) \
                 select count(*) from c",
                (),
            )
            .await
    });

    let mut attempts = 0;
    while !task.is_finished() {
        attempts += 1;
        assert!(attempts < 400, "query was never interrupted");
        db.interrupt()?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let err = task.await.expect("task joined").unwrap_err();
    assert!(err.is_interrupted(), "{err:?}");
    assert!(!err.is_busy());

    assert_eq!(
        db.query_single_value("select 1", ()).await?,
        Some(Value::Int(1))
    );
    Ok(())
}
