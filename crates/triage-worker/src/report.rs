//! Incident report output (newline-delimited JSON)

use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use triage_core::{ScoredNode, TrafficSummary, detection_timestamp};

// attempts at finding a free file name within the same millisecond
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// One output line: a selected node's score merged with its traffic summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    #[serde(rename = "@timestamp")]
    pub timestamp: Option<String>,
    pub ip_address: String,
    pub time_window_hours: u32,
    pub total_matching_sessions: u64,
    pub analyzed_sessions: u64,
    pub outgoing_connections: u64,
    pub incoming_connections: u64,
    pub total_bytes_sent: u64,
    pub total_bytes_received: u64,
    pub unique_destinations: u64,
    pub unique_sources: u64,
    pub composite_score: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportRecord {
    pub fn merge(timestamp: Option<String>, node: &ScoredNode, traffic: TrafficSummary) -> Self {
        Self {
            timestamp,
            ip_address: node.ip.clone(),
            time_window_hours: traffic.time_window_hours,
            total_matching_sessions: traffic.total_matching_sessions,
            analyzed_sessions: traffic.analyzed_sessions,
            outgoing_connections: traffic.outgoing_connections,
            incoming_connections: traffic.incoming_connections,
            total_bytes_sent: traffic.total_bytes_sent,
            total_bytes_received: traffic.total_bytes_received,
            unique_destinations: traffic.unique_destinations,
            unique_sources: traffic.unique_sources,
            composite_score: node.composite_score,
            error: traffic.error,
        }
    }
}

/// Everything produced for one alert file
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub detection_timestamp: Option<String>,
    pub records: Vec<ReportRecord>,
}

impl Report {
    /// Pair each node with its summary (same order). The detection timestamp
    /// comes from the alert file name.
    pub fn build(alert_file: &str, nodes: &[ScoredNode], summaries: Vec<TrafficSummary>) -> Self {
        let detection_timestamp = detection_timestamp(alert_file);
        if detection_timestamp.is_none() {
            warn!(
                file = %alert_file,
                "No YYYYMMDD_HHMMSS timestamp in alert file name, @timestamp will be null"
            );
        }

        let records = nodes
            .iter()
            .zip(summaries)
            .map(|(node, traffic)| ReportRecord::merge(detection_timestamp.clone(), node, traffic))
            .collect();

        Self {
            detection_timestamp,
            records,
        }
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write the report named after the current time. Empty reports are not written.
    pub async fn write(&self, report: &Report) -> io::Result<Option<PathBuf>> {
        self.write_at(report, Local::now()).await
    }

    pub async fn write_at(
        &self,
        report: &Report,
        now: DateTime<Local>,
    ) -> io::Result<Option<PathBuf>> {
        if report.is_empty() {
            return Ok(None);
        }

        fs::create_dir_all(&self.output_dir).await?;
        let (path, mut file) = self.create_unique(now).await?;

        // one complete line per write, so a cut-off file is valid up to its last newline
        for record in &report.records {
            let mut line = serde_json::to_string(record)?;
            line.push('\n');
            file.write_all(line.as_bytes()).await?;
        }
        file.flush().await?;

        info!(file = %path.display(), records = report.count(), "Report written");
        Ok(Some(path))
    }

    async fn create_unique(&self, now: DateTime<Local>) -> io::Result<(PathBuf, fs::File)> {
        let stem = format!("arkime_analysis_{}", now.format("%Y-%m-%d_%H-%M-%S%.3f"));

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{}.jsonl", stem)
            } else {
                format!("{}-{}.jsonl", stem, attempt)
            };
            let path = self.output_dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free report file name for {}", stem),
        ))
    }
}
