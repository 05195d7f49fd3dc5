// Summary statistics over flattened candidates

use crate::ScoredNode;
use std::collections::HashMap;

/// How many candidates each detection method flagged
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCount {
    pub method: String,
    pub count: usize,
    pub percent: f64,
}

/// Breakdown by `detected_by`, most frequent first (ties by name)
pub fn detection_breakdown(nodes: &[ScoredNode]) -> Vec<MethodCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for node in nodes {
        *counts.entry(node.detected_by.as_str()).or_insert(0) += 1;
    }

    let total = nodes.len() as f64;
    let mut breakdown: Vec<MethodCount> = counts
        .into_iter()
        .map(|(method, count)| MethodCount {
            method: method.to_string(),
            count,
            percent: count as f64 / total * 100.0,
        })
        .collect();
    breakdown.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.method.cmp(&b.method)));
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(method: &str) -> ScoredNode {
        ScoredNode {
            ip: "10.0.0.1".to_string(),
            recon_error: 1.0,
            mlp_score: 0.1,
            detected_by: method.to_string(),
            log_timestamp: String::new(),
            update_count: 0,
            total_nodes_in_graph: 0,
            source_file: String::new(),
            composite_score: 1.0,
        }
    }

    #[test]
    fn test_breakdown_order_and_percent() {
        let nodes = vec![node("mlp"), node("recon"), node("recon"), node("both")];
        let breakdown = detection_breakdown(&nodes);

        assert_eq!(breakdown[0].method, "recon");
        assert_eq!(breakdown[0].count, 2);
        assert_eq!(breakdown[0].percent, 50.0);
        assert_eq!(breakdown[1].method, "both");
        assert_eq!(breakdown[2].method, "mlp");
    }

    #[test]
    fn test_breakdown_empty() {
        assert!(detection_breakdown(&[]).is_empty());
    }
}
