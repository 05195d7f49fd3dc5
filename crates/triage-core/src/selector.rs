// Selector - pick the anomalies worth enriching

// Flattens alerts into scored candidates (score computed once, under the run's
// method), drops false positives, then applies the selection policy.

use crate::scoring::ScoreMethod;
use crate::{AlertDocument, NodeAnomaly, ScoredNode};
use serde::Deserialize;

/// How candidates are chosen after scoring
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// the `n` highest scores
    TopN { n: usize },
    /// every score strictly greater than `cutoff`
    Threshold { cutoff: f64 },
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::TopN { n: 1 }
    }
}

/// Predicate that removes known-benign candidates before selection.
/// Returning `true` excludes the anomaly.
pub trait FalsePositiveFilter: Send + Sync {
    fn is_false_positive(&self, anomaly: &NodeAnomaly, alert: &AlertDocument) -> bool;
}

/// Default filter, keeps everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl FalsePositiveFilter for AllowAll {
    fn is_false_positive(&self, _anomaly: &NodeAnomaly, _alert: &AlertDocument) -> bool {
        false
    }
}

impl<F> FalsePositiveFilter for F
where
    F: Fn(&NodeAnomaly, &AlertDocument) -> bool + Send + Sync,
{
    fn is_false_positive(&self, anomaly: &NodeAnomaly, alert: &AlertDocument) -> bool {
        self(anomaly, alert)
    }
}

pub struct Selector {
    method: ScoreMethod,
    policy: SelectionPolicy,
    filter: Box<dyn FalsePositiveFilter>,
}

impl Selector {
    pub fn new(method: ScoreMethod, policy: SelectionPolicy) -> Self {
        Self {
            method,
            policy,
            filter: Box::new(AllowAll),
        }
    }

    /// Swap in a false-positive filter
    pub fn with_filter(mut self, filter: impl FalsePositiveFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn method(&self) -> ScoreMethod {
        self.method
    }

    /// Every non-filtered anomaly in insertion order, with its composite score attached
    pub fn flatten(&self, alerts: &[AlertDocument]) -> Vec<ScoredNode> {
        alerts
            .iter()
            .flat_map(|alert| {
                alert
                    .node_anomalies
                    .iter()
                    .filter(move |anomaly| !self.filter.is_false_positive(anomaly, alert))
                    .map(move |anomaly| ScoredNode::from_anomaly(anomaly, alert, self.method))
            })
            .collect()
    }

    /// Flatten, filter and apply the policy. Output is sorted by score, highest first.
    pub fn select(&self, alerts: &[AlertDocument]) -> Vec<ScoredNode> {
        self.apply_policy(self.flatten(alerts))
    }

    /// Apply the policy to already-scored candidates
    pub fn apply_policy(&self, mut candidates: Vec<ScoredNode>) -> Vec<ScoredNode> {
        if let SelectionPolicy::Threshold { cutoff } = self.policy {
            // NaN comparisons are false, so non-finite scores never pass
            candidates.retain(|c| c.composite_score > cutoff);
        }

        // sort_by is stable: equal scores keep insertion order
        candidates.sort_by(|a, b| {
            rank_key(b.composite_score).total_cmp(&rank_key(a.composite_score))
        });

        if let SelectionPolicy::TopN { n } = self.policy {
            candidates.truncate(n);
        }
        candidates
    }
}

// NaN ranks below everything
fn rank_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}
