//! Alert triage worker: watch, queue, score, enrich, report

pub mod config;
pub mod pipeline;
pub mod queue;
pub mod report;
pub mod watcher;

pub use config::TriageConfig;
pub use pipeline::{Pipeline, PipelineError, ProcessOutcome};
pub use queue::{AlertQueue, Worker, WorkerStats, alert_queue};
pub use report::{Report, ReportRecord, ReportWriter};
pub use watcher::AlertWatcher;
