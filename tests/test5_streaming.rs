use std::sync::{Arc, Mutex};

use litequery::prelude::*;

async fn numbers(n: i64) -> Result<Database, LiteDbError> {
    let db = Database::open_in_memory().await?;
    db.execute("create table t (x)", ()).await?;
    db.execute_multi(
        "insert into t values (?)",
        (1..=n).map(|i| vec![Value::Int(i)]),
    )
    .await?;
    Ok(db)
}

#[tokio::test]
async fn sinks_receive_rows_in_order() -> Result<(), LiteDbError> {
    let db = numbers(5).await?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    db.query_single_column_each("select x from t order by x", (), move |v| {
        sink.lock().unwrap().push(v);
        Ok(())
    })
    .await?;
    let expected: Vec<Value> = (1..=5).map(Value::Int).collect();
    assert_eq!(*seen.lock().unwrap(), expected);

    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    db.query_each("select x from t where x > ? order by x", vec![Value::Int(3)], move |r| {
        sink.lock().unwrap().push(r.get("x").cloned());
        Ok(())
    })
    .await?
    .query_ary_each("select x, x * 2 from t where x = 1", (), |row| {
        assert_eq!(row, vec![Value::Int(1), Value::Int(2)]);
        Ok(())
    })
    .await?;
    assert_eq!(
        *records.lock().unwrap(),
        vec![Some(Value::Int(4)), Some(Value::Int(5))]
    );
    Ok(())
}

#[tokio::test]
async fn sink_error_stops_iteration_and_reaches_the_caller() -> Result<(), LiteDbError> {
    let db = numbers(10).await?;

    let count = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&count);
    let err = db
        .query_ary_each("select x from t order by x", (), move |_| {
            let mut n = sink.lock().unwrap();
            *n += 1;
            if *n == 2 {
                return Err(LiteDbError::ExecutionError("enough".into()));
            }
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LiteDbError::ExecutionError(ref m) if m == "enough"));
    assert_eq!(*count.lock().unwrap(), 2);

    // The abandoned statement was finalized, so schema changes go through.
    db.execute("drop table t", ()).await?;
    Ok(())
}

#[tokio::test]
async fn panicking_sink_surfaces_as_execution_error() -> Result<(), LiteDbError> {
    let db = numbers(3).await?;
    let err = db
        .query_single_column_each("select x from t", (), |_| panic!("sink blew up"))
        .await
        .unwrap_err();
    assert!(matches!(err, LiteDbError::ExecutionError(_)), "{err:?}");

    let count = db.query_single_value("select count(*) from t", ()).await?;
    assert_eq!(count, Some(Value::Int(3)));
    Ok(())
}

#[tokio::test]
async fn trace_hook_sees_stripped_sql() -> Result<(), LiteDbError> {
    let db = Database::open_in_memory().await?;
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&seen);
    db.trace(move |sql| sink.lock().unwrap().push(sql.to_owned()))?;

    db.query("  select 1  \n", ()).await?;
    db.execute("create table t (x); insert into t values (1)", ()).await?;
    db.query(" ", ()).await?;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "select 1".to_string(),
            "create table t (x); insert into t values (1)".to_string(),
        ]
    );

    db.clear_trace()?;
    db.query("select 2", ()).await?;
    assert_eq!(seen.lock().unwrap().len(), 2);
    Ok(())
}
