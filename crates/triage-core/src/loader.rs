//! Alert file loader - parse detector output into an AlertDocument

use crate::{AlertDocument, NodeAnomaly};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Top-level fields every alert file must carry
pub const REQUIRED_FIELDS: [&str; 4] =
    ["timestamp", "update_count", "nodes_in_graph", "node_anomalies"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read alert file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid alert JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("alert is not a JSON object")]
    NotAnObject,

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

// wire shape of the file, before source_file is attached
#[derive(Deserialize)]
struct RawAlert {
    timestamp: String,
    update_count: u64,
    nodes_in_graph: u64,
    node_anomalies: Vec<NodeAnomaly>,
}

/// Load a single alert file.
///
/// Failures are logged here; callers only decide whether to move on.
pub fn load_alert(path: impl AsRef<Path>) -> Result<AlertDocument, LoadError> {
    let path = path.as_ref();
    let result = read_alert(path);
    if let Err(e) = &result {
        warn!(file = %path.display(), error = %e, "Alert file not loaded");
    }
    result
}

fn read_alert(path: &Path) -> Result<AlertDocument, LoadError> {
    let content = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let object = value.as_object().ok_or(LoadError::NotAnObject)?;
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !object.contains_key(**field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingFields(missing));
    }

    let raw: RawAlert = serde_json::from_value(value)?;
    let source_file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let total = raw.node_anomalies.len();
    let node_anomalies: Vec<NodeAnomaly> = raw
        .node_anomalies
        .into_iter()
        .filter(|anomaly| {
            let valid = anomaly.is_valid();
            if !valid {
                warn!(
                    file = %source_file,
                    ip = %anomaly.ip,
                    recon_error = anomaly.recon_error,
                    mlp_score = anomaly.mlp_score,
                    "Dropping anomaly with out-of-range scores"
                );
            }
            valid
        })
        .collect();

    debug!(
        file = %source_file,
        anomalies = node_anomalies.len(),
        dropped = total - node_anomalies.len(),
        "Alert loaded"
    );

    Ok(AlertDocument {
        timestamp: raw.timestamp,
        update_count: raw.update_count,
        nodes_in_graph: raw.nodes_in_graph,
        node_anomalies,
        source_file,
    })
}

/// Alert files directly inside `dir`, ordered by file name
pub fn alert_files(dir: impl AsRef<Path>) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_alert_file(path))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Load every alert file in a directory. Files that fail to load are skipped.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<AlertDocument>, LoadError> {
    let paths = alert_files(dir)?;
    Ok(paths.iter().filter_map(|path| load_alert(path).ok()).collect())
}

/// Only `.json` files are alert files
pub fn is_alert_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
