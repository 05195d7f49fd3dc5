// Triage CLI - offline alert analysis and one-shot Arkime lookups

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::{Path, PathBuf};
use triage_arkime::{ArkimeClient, ArkimeConfig, TrafficSource};
use triage_core::stats::detection_breakdown;
use triage_core::{
    alert_files, load_alert, AlertDocument, ScoreMethod, SelectionPolicy, Selector, TimeRange,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(version = "0.1.0")]
#[command(about = "Anomaly alert triage CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score and rank anomalies from alert files
    Analyze {
        /// Alert files or directories of alert files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Scoring method (weighted, max, geometric; anything else = raw recon error)
        #[arg(short, long, default_value = "weighted", env = "TRIAGE_SCORE_METHOD")]
        method: String,

        /// Show the N highest scores
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Show every anomaly scoring above this value instead of top N
        #[arg(long, conflicts_with = "top")]
        threshold: Option<f64>,

        /// Only files stamped within this range (24h, 7d, 1w)
        #[arg(short, long)]
        since: Option<TimeRange>,
    },

    /// Query Arkime for one IP's recent traffic
    Enrich {
        /// IP address to look up
        ip: String,

        /// Look-back window in hours (default: ARKIME config, 1h)
        #[arg(long)]
        hours: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            paths,
            method,
            top,
            threshold,
            since,
        } => {
            let policy = match threshold {
                Some(cutoff) => SelectionPolicy::Threshold { cutoff },
                None => SelectionPolicy::TopN { n: top },
            };
            analyze(&paths, ScoreMethod::from_name(&method), policy, since)?;
        }
        Commands::Enrich { ip, hours } => {
            enrich(&ip, hours).await?;
        }
    }

    Ok(())
}

// expand directories into their alert files
fn collect_files(paths: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(alert_files(path)?);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn analyze(
    paths: &[PathBuf],
    method: ScoreMethod,
    policy: SelectionPolicy,
    since: Option<TimeRange>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "Alert Analysis".cyan().bold());
    println!("{}", "─".repeat(50).dimmed());

    let now = Utc::now();
    let files: Vec<PathBuf> = collect_files(paths)?
        .into_iter()
        .filter(|p| since.map_or(true, |range| range.includes_file(&file_name(p), now)))
        .collect();

    let mut alerts: Vec<AlertDocument> = Vec::new();
    for path in &files {
        match load_alert(path) {
            Ok(alert) => alerts.push(alert),
            Err(e) => println!("{} {}: {}", "Skipped".yellow(), path.display(), e),
        }
    }

    println!(
        "{} {} of {} files",
        "Loaded:".bold(),
        alerts.len().to_string().green(),
        files.len()
    );
    if let Some(range) = since {
        println!("{} last {}h", "Range:".bold(), range.duration().num_hours());
    }
    println!("{} {}", "Method:".bold(), method);

    let selector = Selector::new(method, policy);
    let flattened = selector.flatten(&alerts);
    if flattened.is_empty() {
        println!("\n{}", "No anomalies found.".yellow());
        return Ok(());
    }

    println!("\n{} ({} anomalies)", "Detection methods".bold(), flattened.len());
    for entry in detection_breakdown(&flattened) {
        println!("  {:<14} {:>6}  {:>5.1}%", entry.method, entry.count, entry.percent);
    }

    let selected = selector.apply_policy(flattened);
    if selected.is_empty() {
        println!("\n{}", "Nothing passed the selection policy.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "#", "IP", "Score", "Recon", "MLP", "Method", "Log Time", "Nodes", "File",
    ]);

    for (rank, node) in selected.iter().enumerate() {
        let method_colored = match node.detected_by.as_str() {
            "both" => node.detected_by.red().bold().to_string(),
            "mlp" => node.detected_by.yellow().to_string(),
            _ => node.detected_by.clone(),
        };

        table.add_row(vec![
            (rank + 1).to_string(),
            node.ip.clone(),
            format!("{:.4}", node.composite_score),
            format!("{:.4}", node.recon_error),
            format!("{:.4}", node.mlp_score),
            method_colored,
            node.log_timestamp.clone(),
            node.total_nodes_in_graph.to_string(),
            node.source_file.clone(),
        ]);
    }

    println!("\n{}", table);
    Ok(())
}

async fn enrich(ip: &str, hours: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ArkimeConfig::from_env();
    if let Some(hours) = hours {
        config.time_window_hours = hours;
    }

    println!(
        "\n{} {} (last {}h)",
        "Querying Arkime for".cyan().bold(),
        ip,
        config.time_window_hours
    );
    println!("{}", "─".repeat(50).dimmed());

    let client = ArkimeClient::new(&config)?;
    let summary = client.traffic_summary(ip).await;

    if let Some(ref error) = summary.error {
        println!("{} {}", "Error:".red().bold(), error);
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
