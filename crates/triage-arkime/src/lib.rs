// Traffic enrichment - per-IP session statistics from Arkime

pub mod client;
pub mod config;
pub mod sessions;
pub mod source;

pub use client::{ArkimeClient, ArkimeError};
pub use config::ArkimeConfig;
pub use sessions::{summarize_sessions, SessionsResponse};
pub use source::TrafficSource;
