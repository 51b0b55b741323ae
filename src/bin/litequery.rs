use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use litequery::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run SQL against a SQLite database or back it up")]
struct Args {
    /// Busy timeout in milliseconds; 0 disables waiting on locks.
    #[arg(long, default_value_t = 5000)]
    busy_timeout_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run SQL and print the rows of the last statement as JSON lines.
    Query {
        db: String,
        sql: String,
        /// Parameters as JSON: an array binds by position, an object by name.
        #[arg(long)]
        params: Option<String>,
    },
    /// Run SQL and print the number of rows changed.
    Execute {
        db: String,
        sql: String,
        #[arg(long)]
        params: Option<String>,
    },
    /// Copy a database to another file, printing progress.
    Backup { src: String, dst: PathBuf },
}

fn parse_params(raw: Option<&str>) -> Result<Params, LiteDbError> {
    match raw {
        None => Ok(Params::Empty),
        Some(text) => {
            let json = serde_json::from_str(text)
                .map_err(|e| LiteDbError::BindError(format!("invalid params JSON: {e}")))?;
            Params::from_json(json)
        }
    }
}

async fn open(path: &str, busy_timeout_ms: u64) -> Result<Database, LiteDbError> {
    let busy_timeout = (busy_timeout_ms > 0).then(|| Duration::from_millis(busy_timeout_ms));
    Database::builder(path).busy_timeout(busy_timeout).open().await
}

async fn run(args: Args) -> Result<(), LiteDbError> {
    match args.command {
        Command::Query { db, sql, params } => {
            let params = parse_params(params.as_deref())?;
            let db = open(&db, args.busy_timeout_ms).await?;
            db.query_each(&sql, params, |record| {
                let line = serde_json::to_string(&record)
                    .map_err(|e| LiteDbError::ExecutionError(e.to_string()))?;
                println!("{line}");
                Ok(())
            })
            .await?;
            db.close().await
        }
        Command::Execute { db, sql, params } => {
            let params = parse_params(params.as_deref())?;
            let db = open(&db, args.busy_timeout_ms).await?;
            let changed = db.execute(&sql, params).await?;
            println!("{changed}");
            db.close().await
        }
        Command::Backup { src, dst } => {
            let db = open(&src, args.busy_timeout_ms).await?;
            db.backup(BackupTarget::Path(dst), |p| {
                eprintln!("{}/{} pages copied", p.total - p.remaining, p.total);
            })
            .await?;
            db.close().await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "litequery failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
