use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use scan_transfer::infra::{BigQueryTableLoader, GcpHttpClient, GcsBlobStore};
use scan_transfer::pipeline::csv_export::render_csv;
use scan_transfer::pipeline::enrich::UploadMetadata;
use scan_transfer::pipeline::ingestion::decode_issues;
use scan_transfer::pipeline::trigger::is_json_object;
use scan_transfer::{
    logging, metrics, server, Config, TransferOutcome, TransferSettings, TransferUseCase,
    TriggerEvent,
};

const DEFAULT_PORT: u16 = 8080;

#[derive(Parser)]
#[command(name = "scan_transfer")]
#[command(about = "Loads security scan issue files into BigQuery and a CSV export")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the storage event endpoint (port defaults to $PORT, then 8080)
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Process a single object, as if its creation event had been delivered
    Process {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        name: String,
        /// Creation timestamp copied into every issue's file_upload_time
        #[arg(long)]
        time_created: String,
    },
    /// Enrich a local scan file and print the CSV export without touching any backend
    Preview {
        #[arg(long)]
        input: PathBuf,
        /// Object name to stamp into source_file (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Defaults to the current time
        #[arg(long)]
        time_created: Option<String>,
    },
}

fn build_use_case(config: &Config) -> Result<TransferUseCase> {
    let http = GcpHttpClient::new(config.gcp.access_token.clone());
    let blobs = GcsBlobStore::new(http.clone(), config.gcp.storage_endpoint.clone());
    let tables = BigQueryTableLoader::from_config(http, config)?;

    Ok(TransferUseCase::new(
        Arc::new(blobs),
        Arc::new(tables),
        TransferSettings::from_config(config),
    ))
}

fn preview(input: PathBuf, name: Option<String>, time_created: Option<String>) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("input path has no file name")?,
    };
    if !is_json_object(&name) {
        info!("Skipping non-JSON file {}", name);
        return Ok(());
    }

    let time_created =
        time_created.unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    let bytes = std::fs::read(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let mut issues = decode_issues(bytes).with_context(|| format!("failed to decode {}", name))?;
    let event = TriggerEvent::new("local", name, time_created);
    UploadMetadata::from_event(&event).apply(&mut issues);

    match render_csv(&issues)? {
        Some(csv) => std::io::stdout().write_all(&csv)?,
        None => info!("No issues in {}, nothing to export", event.name),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config::load()?;
            let use_case = Arc::new(build_use_case(&config)?);
            metrics::init_metrics();

            let port = port
                .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
                .unwrap_or(DEFAULT_PORT);
            server::start_server(use_case, port)
                .await
                .context("event endpoint stopped with an error")?;
        }
        Commands::Process {
            bucket,
            name,
            time_created,
        } => {
            let config = Config::load()?;
            let use_case = build_use_case(&config)?;
            let event = TriggerEvent::new(bucket, name, time_created);

            match use_case.run(&event).await? {
                TransferOutcome::Skipped { object } => {
                    println!("Skipped {} (not a .json object)", object);
                }
                TransferOutcome::Completed(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }
        Commands::Preview {
            input,
            name,
            time_created,
        } => preview(input, name, time_created)?,
    }
    Ok(())
}
