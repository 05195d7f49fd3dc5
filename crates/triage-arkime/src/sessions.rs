// Arkime sessions response and traffic tally

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::net::IpAddr;
use triage_core::TrafficSummary;

/// Fields requested from the sessions API
pub const SESSION_FIELDS: &str = "source.ip,destination.ip,network.bytes,network.packets";

/// Body of `GET /api/sessions`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionsResponse {
    #[serde(default)]
    pub data: Vec<Value>,

    // sessions matching the expression
    #[serde(rename = "recordsFiltered", default)]
    pub records_filtered: Option<u64>,

    // sessions in the whole index
    #[serde(rename = "recordsTotal", default)]
    pub records_total: Option<u64>,
}

impl SessionsResponse {
    pub fn total_matching(&self) -> u64 {
        self.records_filtered
            .or(self.records_total)
            .unwrap_or(self.data.len() as u64)
    }
}

// Arkime returns projected fields either flat ("source.ip") or nested
fn field<'a>(record: &'a Value, dotted: &str) -> Option<&'a Value> {
    record
        .get(dotted)
        .or_else(|| dotted.split('.').try_fold(record, |value, key| value.get(key)))
}

fn str_field<'a>(record: &'a Value, dotted: &str) -> &'a str {
    field(record, dotted).and_then(Value::as_str).unwrap_or("")
}

fn count_field(record: &Value, dotted: &str) -> u64 {
    match field(record, dotted) {
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        None => 0,
    }
}

// textual forms of the same address compare equal (e.g. expanded IPv6)
fn same_ip(a: &str, b: &str) -> bool {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => !a.is_empty() && a == b,
    }
}

#[derive(Default)]
struct TrafficTally {
    outgoing: u64,
    incoming: u64,
    bytes_sent: u64,
    bytes_received: u64,
    destinations: HashSet<String>,
    sources: HashSet<String>,
}

impl TrafficTally {
    fn record(&mut self, ip: &str, session: &Value) {
        let src = str_field(session, "source.ip");
        let dst = str_field(session, "destination.ip");
        let bytes = count_field(session, "network.bytes");

        if same_ip(src, ip) {
            self.outgoing += 1;
            self.bytes_sent += bytes;
            if !dst.is_empty() {
                self.destinations.insert(dst.to_string());
            }
        } else if same_ip(dst, ip) {
            self.incoming += 1;
            self.bytes_received += bytes;
            if !src.is_empty() {
                self.sources.insert(src.to_string());
            }
        }
    }
}

/// Classify every session as outgoing (ip is source) or incoming (ip is
/// destination) and total them up. An empty result set is reported as an error.
pub fn summarize_sessions(
    ip: &str,
    time_window_hours: u32,
    response: &SessionsResponse,
) -> TrafficSummary {
    if response.data.is_empty() {
        return TrafficSummary::failed(
            ip,
            time_window_hours,
            format!("no sessions found for {} in the last {}h", ip, time_window_hours),
        );
    }

    let mut tally = TrafficTally::default();
    for session in &response.data {
        tally.record(ip, session);
    }

    TrafficSummary {
        ip_address: ip.to_string(),
        time_window_hours,
        total_matching_sessions: response.total_matching(),
        analyzed_sessions: response.data.len() as u64,
        outgoing_connections: tally.outgoing,
        incoming_connections: tally.incoming,
        total_bytes_sent: tally.bytes_sent,
        total_bytes_received: tally.bytes_received,
        unique_destinations: tally.destinations.len() as u64,
        unique_sources: tally.sources.len() as u64,
        error: None,
    }
}
