//! Rental contract collector.
//!
//! Pulls every contract row from the open-data API for one district with:
//! - Strictly sequential, paced page requests
//! - Automatic retry with exponential backoff per page
//! - Client-side district/sub-district filtering
//! - Per-record geocoding of lot addresses
//! - Graceful cancellation on Ctrl+C

mod output;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use rental_ingest::{
    normalize_numeric, AddressGeocoder, CancellationToken, EnrichedRecord, Enricher, Pipeline,
    RecordFilter, TracingProgress,
};

#[derive(Parser, Debug)]
#[command(name = "rental-collector")]
#[command(about = "Collect rental contracts for a district and geocode their addresses")]
struct Args {
    /// District (자치구) code, e.g. 11110
    #[arg(long, env = "DISTRICT_CODE")]
    district: Option<String>,

    /// Sub-district (법정동) code
    #[arg(long)]
    sub_district: Option<String>,

    /// District name used in geocoding addresses (default: the row's CGG_NM)
    #[arg(long)]
    district_name: Option<String>,

    /// Skip geocoding
    #[arg(long)]
    no_geocode: bool,

    /// Output file for enriched records (JSON lines)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YAML file overriding retry, pacing and endpoint settings
    #[arg(long, env = "COLLECTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let settings = settings::Settings::load(args.config.as_deref(), !args.no_geocode)?;
    let filter = RecordFilter::new(args.district.clone(), args.sub_district.clone());

    info!(
        district = ?filter.district_code,
        sub_district = ?filter.sub_district_code,
        dataset = %settings.pipeline.source.dataset,
        "Starting rental collector"
    );

    // Handle Ctrl+C
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        cancel_on_signal.cancel();
    });

    let pipeline = Pipeline::new(&settings.pipeline)?;
    let collection = match pipeline.run(&filter, &TracingProgress, &cancel).await {
        Ok(collection) => collection,
        Err(e) if e.is_empty_result() => {
            warn!(error = %e, "Nothing to write");
            return Ok(());
        }
        Err(e) => return Err(e).context("Collection failed"),
    };

    for failure in &collection.failed_windows {
        warn!(window = %failure.range, error = %failure.error, "Window missing from output");
    }

    let mut records = collection.records;
    records.iter_mut().for_each(normalize_numeric);

    let enriched = match &settings.geocoder {
        Some(geocoder_config) => {
            let geocoder = Arc::new(AddressGeocoder::new(geocoder_config.clone())?);
            let enricher = Enricher::new(geocoder, geocoder_config.progress_every);
            let district_name = args.district_name.clone();
            enricher
                .enrich(
                    records,
                    |r| output::address_for(r, district_name.as_deref()),
                    &TracingProgress,
                    &cancel,
                )
                .await
                .context("Geocoding failed")?
        }
        None => records
            .into_iter()
            .map(|record| EnrichedRecord {
                record,
                coordinate: None,
            })
            .collect(),
    };

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| output::default_output_path(chrono::Local::now()));
    let written = output::write_jsonl(&path, &enriched)?;

    let located = enriched.iter().filter(|e| e.coordinate.is_some()).count();
    info!(
        path = %path.display(),
        records = written,
        located = located,
        failed_windows = collection.failed_windows.len(),
        elapsed_secs = (collection.finished_at - collection.started_at).num_seconds(),
        "Collection session complete"
    );

    Ok(())
}
