//! Configuration for the triage worker

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use triage_arkime::ArkimeConfig;
use triage_core::{ScoreMethod, SelectionPolicy};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

// Main config structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    // where the detector drops alert files
    pub watch: WatchConfig,

    // where reports are written
    pub output: OutputConfig,

    pub scoring: ScoringConfig,

    // top_n or threshold
    pub selection: SelectionPolicy,

    // Arkime connection, credentials usually from env
    pub arkime: ArkimeConfig,

    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub input_dir: PathBuf,
    pub mode: WatchMode,
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("/sec/ai-detector/output/anomaly_logs"),
            mode: WatchMode::Poll,
            poll_interval_ms: 1000,
        }
    }
}

// how the input directory is watched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    #[default]
    Poll, // periodic scan, works on network mounts
    Native, // OS notifications (inotify, FSEvents, ...)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/sec/ai-middle/logs"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub method: ScoreMethod,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    // bounded wait on the queue before checking again
    pub queue_wait_ms: u64,

    // parallel Arkime queries per alert
    pub enrich_concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_wait_ms: 1000,
            enrich_concurrency: 4,
        }
    }
}

impl TriageConfig {
    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => load_config(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from a variable lookup.
    /// TRIAGE_THRESHOLD wins over TRIAGE_TOP_N when both are set.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dir) = lookup("TRIAGE_INPUT_DIR") {
            self.watch.input_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("TRIAGE_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(method) = lookup("TRIAGE_SCORE_METHOD") {
            self.scoring.method = ScoreMethod::from_name(&method);
        }
        if let Some(value) = lookup("TRIAGE_TOP_N") {
            let n = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "TRIAGE_TOP_N",
                value: value.clone(),
            })?;
            self.selection = SelectionPolicy::TopN { n };
        }
        if let Some(value) = lookup("TRIAGE_THRESHOLD") {
            let cutoff: f64 = value
                .trim()
                .parse()
                .ok()
                .filter(|c: &f64| c.is_finite())
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "TRIAGE_THRESHOLD",
                    value: value.clone(),
                })?;
            self.selection = SelectionPolicy::Threshold { cutoff };
        }
        self.arkime.apply_env(&lookup);
        Ok(())
    }

    /// Reject values serde accepts but the pipeline cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let SelectionPolicy::Threshold { cutoff } = self.selection {
            if !cutoff.is_finite() {
                return Err(ConfigError::InvalidValue {
                    key: "selection.cutoff",
                    value: cutoff.to_string(),
                });
            }
        }
        Ok(())
    }
}

// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TriageConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: TriageConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[watch]
input_dir = "/data/alerts"
mode = "native"

[output]
dir = "/data/reports"

[scoring]
method = "geometric"

[selection]
type = "threshold"
cutoff = 0.35

[arkime]
url = "https://arkime.lab:8005"
verify_tls = false
time_window_hours = 6

[worker]
enrich_concurrency = 2
"#;
        let config: TriageConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.watch.input_dir, PathBuf::from("/data/alerts"));
        assert_eq!(config.watch.mode, WatchMode::Native);
        assert_eq!(config.watch.poll_interval_ms, 1000);
        assert_eq!(config.scoring.method, ScoreMethod::Geometric);
        assert_eq!(config.selection, SelectionPolicy::Threshold { cutoff: 0.35 });
        assert_eq!(config.arkime.time_window_hours, 6);
        assert!(!config.arkime.verify_tls);
        assert_eq!(config.arkime.max_sessions, 1000);
        assert_eq!(config.worker.enrich_concurrency, 2);
        assert_eq!(config.worker.queue_wait_ms, 1000);
    }

    #[test]
    fn test_defaults() {
        let config: TriageConfig = toml::from_str("").unwrap();
        assert_eq!(config.scoring.method, ScoreMethod::Weighted);
        assert_eq!(config.selection, SelectionPolicy::TopN { n: 1 });
        assert_eq!(config.watch.mode, WatchMode::Poll);
        assert!(config.arkime.username.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TRIAGE_OUTPUT_DIR", "/tmp/out"),
            ("TRIAGE_SCORE_METHOD", "max"),
            ("TRIAGE_TOP_N", "5"),
            ("ARKIME_USERNAME", "analyst"),
        ]);
        let mut config = TriageConfig::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.scoring.method, ScoreMethod::Max);
        assert_eq!(config.selection, SelectionPolicy::TopN { n: 5 });
        assert_eq!(config.arkime.username.as_deref(), Some("analyst"));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = TriageConfig::default();
        let err = config
            .apply_env(|key| (key == "TRIAGE_THRESHOLD").then(|| "high".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "TRIAGE_THRESHOLD", .. }));
    }

    #[test]
    fn test_non_finite_cutoff_in_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.toml");
        fs::write(&path, "[selection]\ntype = \"threshold\"\ncutoff = nan\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "selection.cutoff", .. }));

        fs::write(&path, "[selection]\ntype = \"threshold\"\ncutoff = inf\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_sample_config_file() {
        let config = load_config("../../config/triage.toml").expect("Failed to load config");
        assert_eq!(config.selection, SelectionPolicy::TopN { n: 1 });
        assert_eq!(config.scoring.method, ScoreMethod::Weighted);
    }
}
