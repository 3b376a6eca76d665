//! `run` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, Overrides};
use contracts::PipelineSettings;
use dispatcher::{HttpTransport, SearchDispatcher};
use ingestion::{HtmlListingSource, ListingSource, VehicleRecord};
use publisher::{DryRunClient, MatchPublisher, PubSubRestClient, TopicClient};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let overrides = Overrides {
        worker_count: args.workers,
        search_timeout: args.search_timeout,
    };
    let settings = Arc::new(
        ConfigLoader::load(args.config.as_deref(), &overrides)
            .map_err(CliError::from)
            .context("Failed to load configuration")?,
    );

    info!(
        endpoints = settings.search_apis.len(),
        workers = settings.worker_count,
        search_timeout_ms = settings.search_timeout.as_millis() as u64,
        topic = %settings.pubsub.topic_path(),
        dry_run = args.dry_run,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .user_agent(concat!("hirer-lookup/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(CliError::from)?;

    // Listing failure leaves nothing to do
    let listing = HtmlListingSource::new(client.clone(), &settings.vehicle_list_url);
    let records = listing
        .fetch()
        .await
        .map_err(CliError::from)
        .context("Failed to fetch vehicle list")?;

    let dispatcher = SearchDispatcher::new(HttpTransport::new(client.clone()), &settings.search_apis);

    // Setup graceful shutdown handler
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            warn!("Received shutdown signal, finishing in-flight jobs");
            shutdown.cancel();
        }
    });

    if args.dry_run {
        let topic = DryRunClient::new(settings.pubsub.topic_path());
        execute(&settings, dispatcher, topic, records, shutdown).await
    } else {
        let topic = PubSubRestClient::new(client, &settings.pubsub);
        execute(&settings, dispatcher, topic, records, shutdown).await
    }
}

async fn execute<C>(
    settings: &PipelineSettings,
    dispatcher: SearchDispatcher<HttpTransport>,
    topic: C,
    records: Vec<VehicleRecord>,
    shutdown: CancellationToken,
) -> Result<()>
where
    C: TopicClient + Send + Sync + 'static,
{
    let publisher = Arc::new(MatchPublisher::new(topic, settings.readiness));

    let pipeline = Pipeline::new(
        PipelineConfig::from(settings),
        dispatcher,
        publisher,
        shutdown.clone(),
    );

    info!("Starting pipeline...");
    let stats = pipeline
        .run(records, settings.worker_count)
        .await
        .context("Pipeline execution failed")?;

    info!(
        processed = stats.vehicles_processed,
        published = stats.published,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.2}", stats.throughput()),
        "Pipeline completed"
    );
    stats.print_summary();

    if shutdown.is_cancelled() {
        warn!(unprocessed = stats.unprocessed(), "Run interrupted by shutdown signal");
    }
    info!("Hirer Lookup finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
