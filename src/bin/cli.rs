//! notice-archive CLI
//!
//! Local entry point for listing, synchronizing, merging and exporting the
//! poll-notice archive.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use notice_archive::{
    error::{AppError, Result},
    models::{Category, Config, DuplicatePolicy},
    pipeline::{self, ExportFilter, ExportRequest, SyncOptions},
    services::HttpSource,
    storage::LocalStorage,
    utils::{http, log::step},
};

/// notice-archive - Poll-notice registry archiver
#[derive(Parser, Debug)]
#[command(
    name = "notice-archive",
    version,
    about = "Incremental archive and catalog of published poll notices"
)]
struct Cli {
    /// Directory holding snapshots, documents and config
    #[arg(short, long, default_value = ".", global = true)]
    storage_dir: PathBuf,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registry and save the inventory
    List {
        /// First listing year (default: source.first_year)
        #[arg(long)]
        from_year: Option<i32>,

        /// Last listing year (default: current year)
        #[arg(long)]
        to_year: Option<i32>,
    },

    /// Fetch every inventory entry not archived yet
    Sync {
        /// Refetch everything and replace files already on disk
        #[arg(long)]
        overwrite: bool,
    },

    /// Join archive and inventory into the catalog
    Merge,

    /// Copy catalog documents matching the filters
    Export {
        /// Election category: Pres, Prim, Mun or Leg
        #[arg(long)]
        category: Option<String>,

        /// Keep documents dated on or after this day (YYYY-MM-DD)
        #[arg(long)]
        after: Option<String>,

        /// Keep documents dated on or before this day (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,

        /// Output directory (default: paths.export_dir)
        #[arg(short, long)]
        output: Option<String>,

        /// Catalog file (default: paths.catalog_file)
        #[arg(long)]
        catalog: Option<String>,

        /// Report what would be copied without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Run list, sync and merge in sequence
    Pipeline {
        /// Skip listing, use the existing inventory
        #[arg(long)]
        skip_list: bool,

        /// Refetch everything during sync
        #[arg(long)]
        overwrite: bool,
    },

    /// Validate configuration
    Validate,

    /// Show snapshot status
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Flag set on Ctrl-C; sync stops before its next fetch.
fn install_cancel_handler() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current document...");
            flag.store(true, Ordering::SeqCst);
        }
    });
    cancel
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load(path),
        None => Ok(Config::load_or_default(cli.storage_dir.join("config.toml"))),
    }
}

fn http_source(config: &Config) -> Result<HttpSource> {
    let client = http::create_client(&config.http)?;
    Ok(HttpSource::new(client, config.source.clone()))
}

fn year_range(config: &Config, from: Option<i32>, to: Option<i32>) -> Result<(i32, i32)> {
    let first = from.unwrap_or(config.source.first_year);
    let last = to.unwrap_or_else(|| config.source.last_year());
    if first > last {
        return Err(AppError::validation(format!(
            "--from-year {first} is after --to-year {last}"
        )));
    }
    Ok((first, last))
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let storage = LocalStorage::new(&cli.storage_dir);
    log::debug!("Storage directory: {}", cli.storage_dir.display());

    if !matches!(cli.command, Command::Validate) {
        config.validate()?;
    }

    match cli.command {
        Command::List { from_year, to_year } => {
            let (first, last) = year_range(&config, from_year, to_year)?;
            let source = http_source(&config)?;
            pipeline::run_list(&config, &storage, &source, first..=last).await?;
        }

        Command::Sync { overwrite } => {
            let source = http_source(&config)?;
            let cancel = install_cancel_handler();
            pipeline::run_sync(&config, &storage, &source, SyncOptions { overwrite }, cancel)
                .await?;
        }

        Command::Merge => {
            pipeline::run_merge(&config, &storage).await?;
        }

        Command::Export {
            category,
            after,
            before,
            output,
            catalog,
            dry_run,
        } => {
            let filter = ExportFilter {
                category: category.as_deref().map(str::parse::<Category>).transpose()?,
                after: after.as_deref().map(pipeline::parse_date_bound).transpose()?,
                before: before.as_deref().map(pipeline::parse_date_bound).transpose()?,
            };
            let output = output.unwrap_or_else(|| config.paths.export_dir.clone());
            let catalog = catalog.unwrap_or_else(|| config.paths.catalog_file.clone());
            let request = ExportRequest {
                filter,
                output_dir: storage.path(&output),
                dry_run,
            };

            pipeline::run_export(&storage, &catalog, &request).await?;
        }

        Command::Pipeline {
            skip_list,
            overwrite,
        } => {
            let source = http_source(&config)?;

            if skip_list {
                log::info!("Skipping list, using existing inventory...");
            } else {
                step(1, 3, "Listing registry...");
                let (first, last) = year_range(&config, None, None)?;
                pipeline::run_list(&config, &storage, &source, first..=last).await?;
            }

            step(2, 3, "Synchronizing archive...");
            let cancel = install_cancel_handler();
            let outcome = pipeline::run_sync(
                &config,
                &storage,
                &source,
                SyncOptions { overwrite },
                cancel,
            )
            .await?;

            step(3, 3, "Building catalog...");
            if outcome.stats.cancelled {
                log::warn!("Sync was cancelled; the catalog covers the documents archived so far");
            }
            pipeline::run_merge(&config, &storage).await?;

            log::info!("Pipeline complete!");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK (years {}-{}, selector '{}')",
                config.source.first_year,
                config.source.last_year(),
                config.source.link_selector
            );
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());

            let paths = &config.paths;
            match storage
                .load_inventory(&paths.inventory_file, DuplicatePolicy::First)
                .await
            {
                Ok(inventory) => log::info!("Inventory: {} entries", inventory.len()),
                Err(e) => log::info!("Inventory: {}", e),
            }
            match storage.load_archive_optional(&paths.archive_file).await? {
                Some(archive) => log::info!("Archive: {} records", archive.len()),
                None => log::info!("Archive: not synchronized yet"),
            }
            match storage.load_catalog(&paths.catalog_file).await {
                Ok(catalog) => log::info!("Catalog: {} rows", catalog.len()),
                Err(e) => log::info!("Catalog: {}", e),
            }

            if let Some(bytes) = storage.read_bytes(&paths.stats_file).await? {
                if let Ok(stats) = serde_json::from_slice::<serde_json::Value>(&bytes) {
                    if let Some(end) = stats.get("end_time") {
                        log::info!("Last sync: {}", end);
                    }
                    if let Some(failed) = stats.get("failed") {
                        log::info!("Failed fetches in last sync: {}", failed);
                    }
                }
            } else {
                log::info!("No sync has run yet.");
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
