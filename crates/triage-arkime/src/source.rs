// Traffic source trait
// Abstraction over whatever answers "what did this IP do recently"

use async_trait::async_trait;
use triage_core::TrafficSummary;

#[async_trait]
pub trait TrafficSource: Send + Sync {
    /// Summarize traffic for one IP over the configured window.
    /// Failures come back as a zeroed summary with `error` set.
    async fn traffic_summary(&self, ip: &str) -> TrafficSummary;

    /// Provider name for logs
    fn provider(&self) -> &str;
}
