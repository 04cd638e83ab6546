// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use turnover_store::{FeatureStore, WriteMode};

#[derive(Parser)]
#[command(name = "turnover")]
#[command(about = "Turnover prediction operations CLI")]
#[command(version)]
struct Cli {
    /// Emit machine-readable JSON instead of log lines.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates the database schema (idempotent).
    InitDb {
        #[arg(long, default_value = "turnover.db")]
        db: PathBuf,
    },
    /// Builds a feature batch from the raw HR tables and appends it to the
    /// prepared feature table.
    BuildFeatures {
        #[arg(long, default_value = "turnover.db")]
        db: PathBuf,
        /// Clear the prepared feature table before writing the new batch.
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(u128::from(u64::MAX)) as i64)
        .unwrap_or(0)
}

fn init_db(db: &Path, json_out: bool) -> Result<(), String> {
    let store = FeatureStore::open(db).map_err(|e| e.to_string())?;
    store.init_schema().map_err(|e| e.to_string())?;
    if json_out {
        println!("{}", json!({"ok": true, "db": db.display().to_string()}));
    } else {
        tracing::info!(db = %db.display(), "schema initialized");
    }
    Ok(())
}

fn build_features(db: &Path, refresh: bool, json_out: bool) -> Result<(), String> {
    let mut store = FeatureStore::open(db).map_err(|e| e.to_string())?;
    store.init_schema().map_err(|e| e.to_string())?;
    let mode = if refresh {
        WriteMode::Refresh
    } else {
        WriteMode::Append
    };
    let report = store
        .rebuild_features(now_ms(), mode)
        .map_err(|e| e.to_string())?;
    if json_out {
        println!(
            "{}",
            json!({
                "ok": true,
                "source_rows": report.source_rows,
                "written_rows": report.written_rows,
                "dropped_rows": report.dropped_rows,
            })
        );
    } else {
        tracing::info!(
            source_rows = report.source_rows,
            written_rows = report.written_rows,
            dropped_rows = report.dropped_rows,
            refresh,
            "feature batch written"
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::InitDb { db } => init_db(db, cli.json),
        Commands::BuildFeatures { db, refresh } => build_features(db, *refresh, cli.json),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}
