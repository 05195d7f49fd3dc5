// Arkime sessions client
// One long-lived handle per process: a single reqwest client and a cached
// digest challenge shared by every query.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use digest_auth::{AuthContext, WwwAuthenticateHeader};
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, warn};
use triage_core::TrafficSummary;

use crate::config::ArkimeConfig;
use crate::sessions::{summarize_sessions, SessionsResponse, SESSION_FIELDS};
use crate::source::TrafficSource;

// how much of an error body ends up in the summary
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Error, Debug)]
pub enum ArkimeError {
    #[error("ARKIME_USERNAME and ARKIME_PASSWORD must be set")]
    MissingCredentials,

    #[error("invalid Arkime URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Arkime returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("digest authentication failed: {0}")]
    Auth(String),
}

pub struct ArkimeClient {
    client: Client,
    sessions_url: Url,
    username: String,
    password: String,
    time_window_hours: u32,
    max_sessions: u32,

    // server challenge from the first handshake, reused with an increasing nonce count
    challenge: Mutex<Option<WwwAuthenticateHeader>>,
}

impl ArkimeClient {
    /// Build the client. Fails immediately when credentials are missing.
    pub fn new(config: &ArkimeConfig) -> Result<Self, ArkimeError> {
        let username =
            non_empty(config.username.as_deref()).ok_or(ArkimeError::MissingCredentials)?;
        let password =
            non_empty(config.password.as_deref()).ok_or(ArkimeError::MissingCredentials)?;

        // trailing slash so a path prefix (https://host/arkime) survives the join
        let base = Url::parse(&format!("{}/", config.url.trim_end_matches('/')))
            .map_err(|e| ArkimeError::InvalidUrl(format!("{}: {}", config.url, e)))?;
        let sessions_url = base
            .join("api/sessions")
            .map_err(|e| ArkimeError::InvalidUrl(e.to_string()))?;

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            sessions_url,
            username: username.to_string(),
            password: password.to_string(),
            time_window_hours: config.time_window_hours,
            max_sessions: config.max_sessions,
            challenge: Mutex::new(None),
        })
    }

    /// Create from environment (see [`ArkimeConfig::from_env`])
    pub fn from_env() -> Result<Self, ArkimeError> {
        Self::new(&ArkimeConfig::from_env())
    }

    /// Sessions query URL for one IP
    pub fn sessions_url(&self, ip: &str) -> Result<Url, ArkimeError> {
        Url::parse_with_params(
            self.sessions_url.as_str(),
            &[
                ("date", self.time_window_hours.to_string()),
                ("expression", format!("ip=={}", ip)),
                ("fields", SESSION_FIELDS.to_string()),
                ("length", self.max_sessions.to_string()),
            ],
        )
        .map_err(|e| ArkimeError::InvalidUrl(e.to_string()))
    }

    /// Run the sessions query for one IP. Exactly one query; a digest
    /// challenge is answered inside the same call.
    pub async fn query_sessions(&self, ip: &str) -> Result<SessionsResponse, ArkimeError> {
        let url = self.sessions_url(ip)?;
        let uri = request_uri(&url);

        let mut response = self.send(&url, self.authorization(&uri)?).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(challenge) = response.headers().get(WWW_AUTHENTICATE) {
                let challenge = challenge
                    .to_str()
                    .map_err(|e| ArkimeError::Auth(e.to_string()))?;
                let authorization = self.accept_challenge(challenge, &uri)?;
                debug!("Answering Arkime digest challenge");
                response = self.send(&url, Some(authorization)).await?;
            }
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ArkimeError::Status {
                status,
                body: truncate(body.trim(), ERROR_BODY_LIMIT),
            });
        }

        Ok(response.json().await?)
    }

    async fn send(
        &self,
        url: &Url,
        authorization: Option<String>,
    ) -> Result<Response, ArkimeError> {
        let mut request = self.client.get(url.clone());
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        Ok(request.send().await?)
    }

    // Authorization header from the cached challenge, if we have one yet
    fn authorization(&self, uri: &str) -> Result<Option<String>, ArkimeError> {
        let mut guard = self.challenge.lock().map_err(|_| poisoned())?;
        match guard.as_mut() {
            Some(prompt) => self.respond(prompt, uri).map(Some),
            None => Ok(None),
        }
    }

    // Parse and cache a fresh challenge, then answer it
    fn accept_challenge(&self, header: &str, uri: &str) -> Result<String, ArkimeError> {
        let mut prompt = digest_auth::parse(header).map_err(|e| ArkimeError::Auth(e.to_string()))?;
        let answer = self.respond(&mut prompt, uri)?;
        let mut guard = self.challenge.lock().map_err(|_| poisoned())?;
        *guard = Some(prompt);
        Ok(answer)
    }

    fn respond(
        &self,
        prompt: &mut WwwAuthenticateHeader,
        uri: &str,
    ) -> Result<String, ArkimeError> {
        let context = AuthContext::new(self.username.as_str(), self.password.as_str(), uri);
        prompt
            .respond(&context)
            .map(|answer| answer.to_header_string())
            .map_err(|e| ArkimeError::Auth(e.to_string()))
    }
}

#[async_trait]
impl TrafficSource for ArkimeClient {
    async fn traffic_summary(&self, ip: &str) -> TrafficSummary {
        match self.query_sessions(ip).await {
            Ok(response) => {
                let summary = summarize_sessions(ip, self.time_window_hours, &response);
                debug!(
                    ip = %ip,
                    sessions = summary.analyzed_sessions,
                    outgoing = summary.outgoing_connections,
                    incoming = summary.incoming_connections,
                    "Arkime query complete"
                );
                summary
            }
            Err(e) => {
                warn!(ip = %ip, error = %e, "Arkime query failed");
                TrafficSummary::failed(ip, self.time_window_hours, e.to_string())
            }
        }
    }

    fn provider(&self) -> &str {
        "arkime"
    }
}

fn poisoned() -> ArkimeError {
    ArkimeError::Auth("challenge lock poisoned".to_string())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// the request-target the digest response is computed over
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ArkimeConfig {
        ArkimeConfig {
            username: Some("analyst".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_credentials_fail_construction() {
        let mut cfg = config();
        cfg.password = None;
        assert!(matches!(ArkimeClient::new(&cfg), Err(ArkimeError::MissingCredentials)));

        let mut cfg = config();
        cfg.username = Some("  ".to_string());
        assert!(matches!(ArkimeClient::new(&cfg), Err(ArkimeError::MissingCredentials)));
    }

    #[test]
    fn test_invalid_url() {
        let mut cfg = config();
        cfg.url = "not a url".to_string();
        assert!(matches!(ArkimeClient::new(&cfg), Err(ArkimeError::InvalidUrl(_))));
    }

    #[test]
    fn test_sessions_url_params() {
        let client = ArkimeClient::new(&config()).unwrap();
        let url = client.sessions_url("10.0.0.5").unwrap();

        assert_eq!(url.path(), "/api/sessions");
        assert_eq!(url.port(), Some(8005));
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(params.contains(&("date".to_string(), "1".to_string())));
        assert!(params.contains(&("expression".to_string(), "ip==10.0.0.5".to_string())));
        assert!(params.contains(&("fields".to_string(), SESSION_FIELDS.to_string())));
        assert_eq!(client.provider(), "arkime");
    }

    #[test]
    fn test_url_path_prefix_kept() {
        let mut cfg = config();
        cfg.url = "https://sensor.lab/arkime/".to_string();
        let client = ArkimeClient::new(&cfg).unwrap();
        assert_eq!(client.sessions_url("::1").unwrap().path(), "/arkime/api/sessions");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
