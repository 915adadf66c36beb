//! catalog-import - bulk catalog reconciliation CLI
//!
//! ```bash
//! catalog-import import menu r42/menu.csv --partial
//! catalog-import export addon 42 43 --output addons.csv
//! catalog-import template item_addon_group
//! ```
//!
//! Upload references are relative to `UPLOAD_DIR`.

use anyhow::Context;
use catalog_import::db::PgCatalogStore;
use catalog_import::export::ExportTable;
use catalog_import::import::render_csv;
use catalog_import::{
    ApiResponse, AppError, CatalogImporter, Config, HttpSearchIndex, ImportError, LocalFileStore,
    NoopSearchIndex, SearchIndex, init_logger_with_file, template,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shared::models::{ImportKind, ImportMode};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "catalog-import")]
#[command(about = "Bulk import and export of restaurant catalogs")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Directory staged uploads are read from
    #[arg(long, env = "UPLOAD_DIR")]
    upload_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile an uploaded CSV with the stored catalog
    Import {
        /// menu | addon | item_addon_group
        kind: ImportKind,
        /// Upload reference under UPLOAD_DIR
        file: String,
        /// Append without renumbering untouched siblings
        #[arg(long)]
        partial: bool,
        /// Run every check, write nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Write the stored catalog in upload format
    Export {
        kind: ImportKind,
        #[arg(required = true)]
        restaurant_ids: Vec<i64>,
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the header row of an import kind
    Template { kind: ImportKind },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    if let Some(dir) = cli.upload_dir {
        config.upload_dir = dir;
    }
    let json_logs = config.log_json || config.is_production();
    init_logger_with_file(&config.log_level, json_logs, config.log_dir.as_deref())?;

    match cli.command {
        Command::Template { kind } => {
            let table = ExportTable {
                columns: template(kind),
                rows: Vec::new(),
            };
            print!("{}", String::from_utf8(render_csv(&table)?)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Export {
            kind,
            restaurant_ids,
            output,
        } => {
            let importer = connect(&config).await?;
            let table = importer.export(kind, &restaurant_ids).await?;
            let bytes = render_csv(&table)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, bytes)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), rows = table.len(), "Export written");
                }
                None => print!("{}", String::from_utf8(bytes)?),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Import {
            kind,
            file,
            partial,
            dry_run,
        } => {
            let importer = connect(&config).await?;
            let files = LocalFileStore::new(&config.upload_dir);
            let mode = ImportMode {
                is_partial: partial,
            };
            let result = if dry_run {
                importer.validate_file(&files, kind, &file, mode).await
            } else {
                importer.import_file(&files, kind, &file, mode).await
            };
            match result {
                Ok(summary) => {
                    print_json(&ApiResponse::success(summary))?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    report_failure(e)?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<CatalogImporter> {
    let store = PgCatalogStore::connect(&config.database_url, config.db_max_connections)
        .await
        .context("connecting to catalog database")?;
    let search_index: Arc<dyn SearchIndex> = match &config.search_index_url {
        Some(url) => Arc::new(HttpSearchIndex::new(url.clone())?),
        None => {
            tracing::debug!("SEARCH_INDEX_URL not set, search index notifications disabled");
            Arc::new(NoopSearchIndex)
        }
    };
    Ok(CatalogImporter::new(Arc::new(store), search_index))
}

fn report_failure(err: ImportError) -> anyhow::Result<()> {
    let app: AppError = err.into();
    if app.http_status().is_server_error() {
        tracing::error!(code = app.code.code(), message = %app.message, "Import failed");
    }
    print_json(&ApiResponse::<()>::error(&app))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
