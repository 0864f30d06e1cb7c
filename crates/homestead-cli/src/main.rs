//! Homestead CLI: runs the integration layer's operations from the command line.
//!
//! Configuration comes from the environment (and `.env`), the same as the web tier.

mod store;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use homestead_core::models::{GeocodeQuery, SearchFilters, StoredAsset, UploadTask};
use homestead_core::Config;
use homestead_infra::{init_telemetry, shutdown_telemetry};
use homestead_processing::TransformEngine;
use homestead_services::{GeocodingResolver, ImportWorkflow, ListingClient};
use homestead_storage::{LocalStorage, StoragePolicy};
use homestead_worker::{IngestionQueue, IngestionStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::store::JsonLinesStore;

#[derive(Parser)]
#[command(name = "homestead", about = "Homestead integration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcode images to WebP and store them (CDN with local fallback)
    Ingest {
        /// Image files; each is copied to the upload temp dir first
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Target directory, e.g. properties/42
        #[arg(long)]
        dir: String,
        #[arg(long)]
        property_id: Option<i64>,
    },
    /// Address to coordinates
    Geocode {
        address: String,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        state: String,
        #[arg(long, default_value = "")]
        zip: String,
    },
    /// Coordinates to address
    Reverse {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// External listing API
    Listings {
        #[command(subcommand)]
        sub: ListingCommands,
    },
    /// Create properties (geocoded best-effort) in a JSON lines file
    Import {
        #[command(subcommand)]
        sub: ImportCommands,
    },
}

#[derive(Subcommand)]
enum ListingCommands {
    /// Search listings by location
    Search {
        location: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Photos and contact for one listing
    Details { external_id: String },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Rows from a JSON array of `{header: value}` objects (an exported CSV)
    Rows {
        file: PathBuf,
        #[arg(long, default_value = "properties.jsonl")]
        out: PathBuf,
    },
    /// Search results for a location
    Listings {
        location: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "properties.jsonl")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    min_price: Option<u64>,
    #[arg(long)]
    max_price: Option<u64>,
    #[arg(long)]
    min_beds: Option<u32>,
    #[arg(long)]
    min_baths: Option<u32>,
    /// Upstream home type, e.g. Houses, LotsLand
    #[arg(long)]
    home_type: Option<String>,
    #[arg(long)]
    page: Option<u32>,
}

impl From<FilterArgs> for SearchFilters {
    fn from(args: FilterArgs) -> Self {
        SearchFilters {
            min_price: args.min_price,
            max_price: args.max_price,
            min_beds: args.min_beds,
            min_baths: args.min_baths,
            home_type: args.home_type,
            page: args.page,
        }
    }
}

#[derive(Serialize)]
struct IngestReport {
    task_id: String,
    source: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    asset: Option<StoredAsset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    init_telemetry("homestead-cli", None)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let result = run(cli.command, &config).await;
    shutdown_telemetry().await;
    result
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Ingest {
            files,
            dir,
            property_id,
        } => ingest(config, files, dir, property_id).await,
        Commands::Geocode {
            address,
            city,
            state,
            zip,
        } => {
            let resolver = GeocodingResolver::from_config(&config.geocoding)?;
            let query = GeocodeQuery::new(address, city, state, zip);
            print_json(&resolver.geocode(&query).await)
        }
        Commands::Reverse {
            latitude,
            longitude,
        } => {
            let resolver = GeocodingResolver::from_config(&config.geocoding)?;
            print_json(&resolver.reverse_geocode(latitude, longitude).await)
        }
        Commands::Listings { sub } => {
            let client = ListingClient::new(config.listing_api.clone())?;
            let result = match sub {
                ListingCommands::Search { location, filters } => client
                    .search(&location, &filters.into())
                    .await
                    .map(serde_json::to_value),
                ListingCommands::Details { external_id } => client
                    .fetch_details(&external_id)
                    .await
                    .map(serde_json::to_value),
            };
            match result {
                Ok(value) => print_json(&value?),
                Err(e) => Err(anyhow::anyhow!(e.user_message())),
            }
        }
        Commands::Import { sub } => import(config, sub).await,
    }
}

async fn ingest(
    config: &Config,
    files: Vec<PathBuf>,
    dir: String,
    property_id: Option<i64>,
) -> Result<()> {
    let temp_dir = &config.local_storage.temp_dir;
    tokio::fs::create_dir_all(temp_dir)
        .await
        .with_context(|| format!("Failed to create {}", temp_dir.display()))?;

    let local = LocalStorage::new(
        config.local_storage.root.clone(),
        config.local_storage.base_url.clone(),
    )
    .await?;
    let policy = StoragePolicy::with_ftp(config.cdn.clone(), local);
    if !policy.cdn_enabled() {
        tracing::info!("CDN not configured; assets will be stored locally");
    }

    let (events_tx, mut events_rx) = mpsc::channel(files.len().max(1));
    let queue = IngestionQueue::new(
        &config.queue,
        TransformEngine::default(),
        Arc::new(policy),
        Some(events_tx),
    );

    let mut sources = HashMap::new();
    for file in &files {
        let original_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut task = UploadTask::new(PathBuf::new(), original_name, dir.as_str());
        task.temp_path = temp_dir.join(task.id.to_string());
        tokio::fs::copy(file, &task.temp_path)
            .await
            .with_context(|| format!("Failed to stage {}", file.display()))?;
        if let Some(id) = property_id {
            task = task.with_property(id);
        }

        sources.insert(task.id, file.display().to_string());
        queue.submit(task).await?;
    }

    let mut reports = Vec::with_capacity(files.len());
    while reports.len() < files.len() {
        let Some(event) = events_rx.recv().await else {
            break;
        };
        let source = sources.remove(&event.task_id).unwrap_or_default();
        let (status, asset, error) = match event.status {
            IngestionStatus::Stored(asset) => ("stored", Some(asset), None),
            IngestionStatus::SourceMissing => ("source_missing", None, None),
            IngestionStatus::Failed { error } => ("failed", None, Some(error)),
        };
        reports.push(IngestReport {
            task_id: event.task_id.to_string(),
            source,
            status,
            asset,
            error,
        });
    }
    queue.shutdown().await;

    print_json(&reports)?;
    if reports.iter().any(|r| r.status == "failed") {
        anyhow::bail!("One or more uploads failed");
    }
    Ok(())
}

async fn import(config: &Config, command: ImportCommands) -> Result<()> {
    let geocoder = Arc::new(GeocodingResolver::from_config(&config.geocoding)?);

    let summary = match command {
        ImportCommands::Rows { file, out } => {
            let contents = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let rows: Vec<HashMap<String, String>> =
                serde_json::from_str(&contents).context("Expected a JSON array of string maps")?;

            let store = Arc::new(JsonLinesStore::open(out).await?);
            ImportWorkflow::new(store, geocoder).import_rows(&rows).await
        }
        ImportCommands::Listings {
            location,
            filters,
            out,
        } => {
            let client = ListingClient::new(config.listing_api.clone())?;
            let records = client
                .search(&location, &filters.into())
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            let store = Arc::new(JsonLinesStore::open(out).await?);
            ImportWorkflow::new(store, geocoder)
                .import_listings(&records)
                .await
        }
    };

    print_json(&serde_json::json!({
        "created": summary.created,
        "geocoded": summary.geocoded,
        "skipped": summary
            .skipped
            .iter()
            .map(|s| serde_json::json!({ "index": s.index, "reason": s.reason }))
            .collect::<Vec<_>>()
    }))
}
