//! Card import CLI.
//!
//! Usage:
//!   card-import --collection twice --name "TWICE" --group girlgroups [--promo] [--create]
//!               [--mode skip|overwrite|update] [--validate-only] <directory>

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use card_import_lib::config::Config;
use card_import_lib::db::DbPool;
use card_import_lib::models::{FileAsset, ImportRequest, OverwriteMode};
use card_import_lib::services::storage::content_type_for_extension;
use card_import_lib::services::{ImportService, open_store};

struct Args {
    collection: String,
    display_name: Option<String>,
    group: String,
    promo: bool,
    create: bool,
    mode: OverwriteMode,
    validate_only: bool,
    directory: PathBuf,
}

fn print_usage() {
    eprintln!(
        "Usage: card-import --collection <key> --group <tag> [--name <display name>] \
         [--promo] [--create] [--mode skip|overwrite|update] [--validate-only] <directory>"
    );
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut collection = None;
    let mut display_name = None;
    let mut group = None;
    let mut promo = false;
    let mut create = false;
    let mut mode = OverwriteMode::Skip;
    let mut validate_only = false;
    let mut directory = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--collection" | "-c" => {
                i += 1;
                collection = args.get(i).cloned();
            }
            "--name" | "-n" => {
                i += 1;
                display_name = args.get(i).cloned();
            }
            "--group" | "-g" => {
                i += 1;
                group = args.get(i).cloned();
            }
            "--mode" | "-m" => {
                i += 1;
                let value = args.get(i).map(String::as_str).unwrap_or_default();
                mode = OverwriteMode::parse(value).ok_or_else(|| {
                    format!("Invalid mode '{}'. Must be: skip, overwrite, update", value)
                })?;
            }
            "--promo" => promo = true,
            "--create" => create = true,
            "--validate-only" => validate_only = true,
            other if other.starts_with('-') => return Err(format!("Unknown argument: {}", other)),
            other => directory = Some(PathBuf::from(other)),
        }
        i += 1;
    }

    Ok(Args {
        collection: collection.ok_or("--collection is required")?,
        display_name,
        group: group.ok_or("--group is required")?,
        promo,
        create,
        mode,
        validate_only,
        directory: directory.ok_or("a directory is required")?,
    })
}

/// Read every regular, non-hidden file of `dir`, sorted by name.
async fn read_files(dir: &Path) -> std::io::Result<Vec<FileAsset>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type().await?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = tokio::fs::read(&path).await?;
        files.push(FileAsset::new(name, content_type_for_extension(&ext), data));
    }

    Ok(files)
}

#[tokio::main]
async fn main() {
    let argv: Vec<String> = env::args().collect();
    if argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL and S3 credentials must be set");
            std::process::exit(1);
        }
    };

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let files = match read_files(&args.directory).await {
        Ok(files) => files,
        Err(e) => {
            error!("Failed to read {}: {}", args.directory.display(), e);
            std::process::exit(1);
        }
    };
    info!("Read {} file(s) from {}", files.len(), args.directory.display());

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(code = e.code(), "{}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = pool.run_migrations().await {
        error!(code = e.code(), "{}", e);
        std::process::exit(1);
    }

    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!(code = e.code(), "Failed to initialize storage: {}", e);
            std::process::exit(1);
        }
    };

    let service = ImportService::new(Arc::new(pool), store, config.limits);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling import");
            on_signal.cancel();
        }
    });

    let request = ImportRequest {
        display_name: args.display_name.unwrap_or_else(|| args.collection.clone()),
        collection_key: args.collection,
        group_tag: args.group,
        is_promotional: args.promo,
        create_collection: args.create,
        overwrite_mode: args.mode,
        validate_only: args.validate_only,
        files,
    };

    let result = match service.import_with_cancel(request, cancel).await {
        Ok(result) => result,
        Err(e) => {
            error!(code = e.code(), "Import rejected: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize result: {}", e),
    }

    if !result.success {
        std::process::exit(if result.partial_success { 2 } else { 1 });
    }
}
