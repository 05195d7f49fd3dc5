use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use triage_arkime::{ArkimeClient, TrafficSource};
use triage_core::Selector;
use triage_worker::{AlertWatcher, Pipeline, ReportWriter, TriageConfig, Worker, alert_queue};

#[derive(Parser)]
#[command(name = "triage-worker")]
#[command(
    about = "Watch for anomaly alerts and enrich the top suspects with Arkime traffic",
    long_about = None
)]
struct Args {
    /// TOML config file (defaults plus environment when omitted)
    #[arg(short, long, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    //logging setup
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = TriageConfig::load(args.config.as_deref())?;

    // Arkime client needs credentials, refuse to start without them
    info!(url = %config.arkime.url, "Setting up Arkime client...");
    let client = ArkimeClient::new(&config.arkime).inspect_err(|e| {
        error!(error = %e, "Cannot create Arkime client");
    })?;
    let source: Arc<dyn TrafficSource> = Arc::new(client);

    tokio::fs::create_dir_all(&config.output.dir).await?;
    if !config.watch.input_dir.is_dir() {
        error!(dir = %config.watch.input_dir.display(), "Input directory does not exist");
        let dir = config.watch.input_dir.display();
        return Err(format!("input directory {} not found", dir).into());
    }

    let selector = Selector::new(config.scoring.method, config.selection);
    info!(
        method = %config.scoring.method,
        policy = ?config.selection,
        output = %config.output.dir.display(),
        "Pipeline ready"
    );
    let pipeline = Pipeline::new(selector, source, ReportWriter::new(&config.output.dir))
        .with_concurrency(config.worker.enrich_concurrency);

    let (queue, rx) = alert_queue();
    let (stop_tx, stop_rx) = watch::channel(false);

    let worker = Worker::new(rx, pipeline, Duration::from_millis(config.worker.queue_wait_ms));
    let handle = tokio::spawn(worker.run(stop_rx));

    let watcher = AlertWatcher::start(
        &config.watch.input_dir,
        config.watch.mode,
        Duration::from_millis(config.watch.poll_interval_ms),
        queue,
    )?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, stopping watcher");
    drop(watcher);

    // in-flight alert finishes, queued ones are dropped
    stop_tx.send(true).ok();
    let stats = handle.await?;
    info!(
        processed = stats.processed,
        reported = stats.reported,
        "Triage worker stopped"
    );
    Ok(())
}
