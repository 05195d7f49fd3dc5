//! Composite severity scoring
//!
//! Every place in the pipeline that needs a composite score goes through
//! [`ScoreMethod::score`], so a candidate scored while flattening and one
//! re-scored later under the same method always agree bit for bit.

use crate::NodeAnomaly;
use serde::Deserialize;
use std::fmt;

// recon error at which the normalized signal saturates
const RECON_SATURATION: f64 = 15.0;

// Methods for combining recon error and mlp score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum ScoreMethod {
    /// 0.8 * r + 0.2 * (m * 20)
    #[default]
    Weighted,
    /// max(min(r / 15, 1), m)
    Max,
    /// sqrt((r / 15) * m), or r / 15 when either signal is zero
    Geometric,
    /// recon error unmodified (any unrecognized name)
    Raw,
}

impl ScoreMethod {
    /// Parse method name (case-insensitive). Unknown names fall back to `Raw`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "weighted" => Self::Weighted,
            "max" => Self::Max,
            "geometric" => Self::Geometric,
            _ => Self::Raw,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Max => "max",
            Self::Geometric => "geometric",
            Self::Raw => "raw",
        }
    }

    /// Composite score for a recon error `r` and mlp score `m`
    pub fn score(&self, recon_error: f64, mlp_score: f64) -> f64 {
        match self {
            Self::Weighted => 0.8 * recon_error + 0.2 * (mlp_score * 20.0),
            Self::Max => (recon_error / RECON_SATURATION).min(1.0).max(mlp_score),
            Self::Geometric => {
                if recon_error > 0.0 && mlp_score > 0.0 {
                    ((recon_error / RECON_SATURATION) * mlp_score).sqrt()
                } else {
                    recon_error / RECON_SATURATION
                }
            }
            Self::Raw => recon_error,
        }
    }

    pub fn score_anomaly(&self, anomaly: &NodeAnomaly) -> f64 {
        self.score(anomaly.recon_error, anomaly.mlp_score)
    }
}

impl From<String> for ScoreMethod {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
