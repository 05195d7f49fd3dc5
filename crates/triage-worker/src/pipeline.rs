// Per-alert processing: load -> score -> select -> enrich -> write

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use triage_arkime::TrafficSource;
use triage_core::stats::detection_breakdown;
use triage_core::{LoadError, ScoredNode, Selector, TrafficSummary, load_alert};

use crate::report::{Report, ReportWriter};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("alert not loaded: {0}")]
    Load(#[from] LoadError),

    #[error("failed to write report: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// report written with this many records
    Reported { path: PathBuf, records: usize },
    /// nothing survived filtering/selection, no report
    NoCandidates,
}

pub struct Pipeline {
    selector: Selector,
    source: Arc<dyn TrafficSource>,
    writer: ReportWriter,
    enrich_concurrency: usize,
}

impl Pipeline {
    pub fn new(selector: Selector, source: Arc<dyn TrafficSource>, writer: ReportWriter) -> Self {
        Self {
            selector,
            source,
            writer,
            enrich_concurrency: 1,
        }
    }

    /// Max Arkime queries in flight for one alert (at least 1)
    pub fn with_concurrency(mut self, enrich_concurrency: usize) -> Self {
        self.enrich_concurrency = enrich_concurrency.max(1);
        self
    }

    /// Run one alert file end to end
    pub async fn process(&self, path: &Path) -> Result<ProcessOutcome, PipelineError> {
        let alert = load_alert(path)?;

        let flattened = self.selector.flatten(std::slice::from_ref(&alert));
        debug!(
            anomalies = flattened.len(),
            breakdown = ?detection_breakdown(&flattened)
                .iter()
                .map(|m| (m.method.as_str(), m.count))
                .collect::<Vec<_>>(),
            "Alert flattened"
        );

        let candidates = self.selector.apply_policy(flattened);
        if candidates.is_empty() {
            info!(file = %alert.source_file, "No candidates selected, skipping enrichment");
            return Ok(ProcessOutcome::NoCandidates);
        }
        info!(
            candidates = candidates.len(),
            method = %self.selector.method(),
            provider = self.source.provider(),
            top_ip = %candidates[0].ip,
            top_score = candidates[0].composite_score,
            "Candidates selected"
        );

        let summaries = self.enrich(&candidates).await;
        let report = Report::build(&alert.source_file, &candidates, summaries);

        match self.writer.write(&report).await? {
            Some(path) => Ok(ProcessOutcome::Reported {
                path,
                records: report.count(),
            }),
            None => Ok(ProcessOutcome::NoCandidates),
        }
    }

    // one query per candidate; `buffered` keeps results in candidate (score) order.
    // Futures own their IP and source handle, the worker future must stay Send.
    async fn enrich(&self, candidates: &[ScoredNode]) -> Vec<TrafficSummary> {
        let ips: Vec<String> = candidates.iter().map(|c| c.ip.clone()).collect();
        stream::iter(ips)
            .map(|ip| {
                let source = Arc::clone(&self.source);
                async move { source.traffic_summary(&ip).await }
            })
            .buffered(self.enrich_concurrency)
            .collect()
            .await
    }
}
