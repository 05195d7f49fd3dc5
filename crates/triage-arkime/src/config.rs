// Arkime connection settings

use serde::Deserialize;
use std::fmt;

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ArkimeConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_tls: bool,
    pub time_window_hours: u32,
    pub timeout_secs: u64,
    pub max_sessions: u32,
}

impl Default for ArkimeConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8005".to_string(),
            username: None,
            password: None,
            verify_tls: true,
            time_window_hours: 1,
            timeout_secs: 30,
            max_sessions: 1000,
        }
    }
}

impl ArkimeConfig {
    /// Create from environment variables
    /// - ARKIME_URL: Base URL (default: http://localhost:8005)
    /// - ARKIME_USERNAME / ARKIME_PASSWORD: digest credentials
    /// - ARKIME_VERIFY_SSL: "true" (default) or "false"
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Override fields from a variable lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ARKIME_URL") {
            self.url = url;
        }
        if let Some(username) = lookup("ARKIME_USERNAME") {
            self.username = Some(username);
        }
        if let Some(password) = lookup("ARKIME_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(verify) = lookup("ARKIME_VERIFY_SSL") {
            self.verify_tls = verify.trim().eq_ignore_ascii_case("true");
        }
    }
}

// keep the password out of logs
impl fmt::Debug for ArkimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArkimeConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("verify_tls", &self.verify_tls)
            .field("time_window_hours", &self.time_window_hours)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_sessions", &self.max_sessions)
            .finish()
    }
}
