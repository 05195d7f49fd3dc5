//! Core types for the alert triage pipeline
//! this crate contains the shared data structures used across all components.
pub mod loader;
pub mod scoring;
pub mod selector;
pub mod stats;
pub mod timestamp;

pub use loader::{alert_files, load_alert, load_dir, LoadError};
pub use scoring::ScoreMethod;
pub use selector::{AllowAll, FalsePositiveFilter, SelectionPolicy, Selector};
pub use timestamp::{detection_timestamp, TimeRange};

use serde::{Deserialize, Serialize};

// NODE ANOMALY //

/// One flagged node as written by the upstream graph detector

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAnomaly {
    pub ip: String,

    #[serde(default)]
    pub recon_error: f64, // structural reconstruction error, >= 0

    #[serde(default)]
    pub mlp_score: f64, // classifier probability in [0, 1]

    #[serde(default)]
    pub detected_by: String,
}

impl NodeAnomaly {
    /// Both signals must be finite; recon error non-negative and mlp score a probability
    pub fn is_valid(&self) -> bool {
        self.recon_error.is_finite()
            && self.recon_error >= 0.0
            && self.mlp_score.is_finite()
            && (0.0..=1.0).contains(&self.mlp_score)
    }
}

// ALERT DOCUMENT (one detector output file)

/// A parsed alert file. Built by the loader and never modified afterwards.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDocument {
    pub timestamp: String,
    pub update_count: u64,
    pub nodes_in_graph: u64,
    pub node_anomalies: Vec<NodeAnomaly>,

    #[serde(default)]
    pub source_file: String, // base name of the file it was loaded from
}

// SCORED NODE (anomaly + alert metadata)

// a candidate for enrichment: the anomaly flattened together with the metadata of
// the alert it came from. composite_score is computed once when flattening.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub ip: String,
    pub recon_error: f64,
    pub mlp_score: f64,
    pub detected_by: String,
    pub log_timestamp: String,
    pub update_count: u64,
    pub total_nodes_in_graph: u64,
    pub source_file: String,
    pub composite_score: f64,
}

impl ScoredNode {
    pub fn from_anomaly(anomaly: &NodeAnomaly, alert: &AlertDocument, method: ScoreMethod) -> Self {
        Self {
            ip: anomaly.ip.clone(),
            recon_error: anomaly.recon_error,
            mlp_score: anomaly.mlp_score,
            detected_by: anomaly.detected_by.clone(),
            log_timestamp: alert.timestamp.clone(),
            update_count: alert.update_count,
            total_nodes_in_graph: alert.nodes_in_graph,
            source_file: alert.source_file.clone(),
            composite_score: method.score_anomaly(anomaly),
        }
    }
}

// TRAFFIC SUMMARY (enrichment result)

/// Observed traffic for one IP. The shape is identical whether the query
/// succeeded or not; failures only add `error` and leave the counters at zero.

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSummary {
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

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrafficSummary {
    /// All counters zeroed
    pub fn empty(ip: impl Into<String>, time_window_hours: u32) -> Self {
        Self {
            ip_address: ip.into(),
            time_window_hours,
            ..Default::default()
        }
    }

    /// Zeroed summary carrying the reason the query failed
    pub fn failed(ip: impl Into<String>, time_window_hours: u32, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(ip, time_window_hours)
        }
    }
}
