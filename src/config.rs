// 🔧 Configuration - Runtime settings for the CLI, TUI and HTTP server
//
// Environment variables:
//   CLOSE_HOST                  bind host for the API server
//   CLOSE_PORT                  bind port for the API server
//   CLOSE_AUTOMATION_DELAY_MS   simulated latency before each automation
//   CLOSE_SESSION_TTL_MINUTES   session lifetime after login
//   CLOSE_TASK_LIST             task list loaded when a session starts

use std::time::Duration;

use crate::seed::DEFAULT_TASK_LIST;

pub const HOST_ENV: &str = "CLOSE_HOST";
pub const PORT_ENV: &str = "CLOSE_PORT";
pub const AUTOMATION_DELAY_ENV: &str = "CLOSE_AUTOMATION_DELAY_MS";
pub const SESSION_TTL_ENV: &str = "CLOSE_SESSION_TTL_MINUTES";
pub const TASK_LIST_ENV: &str = "CLOSE_TASK_LIST";

/// Default pacing for automation actions (demo latency).
pub const DEFAULT_AUTOMATION_DELAY_MS: u64 = 600;

pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Delay before an automation is applied.
    pub automation_delay: Duration,
    /// Session lifetime after login.
    pub session_ttl: chrono::Duration,
    /// Task list a new session starts on.
    pub default_task_list: String,
}

impl AppConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_automation_delay_ms(mut self, millis: u64) -> Self {
        self.automation_delay = Duration::from_millis(millis);
        self
    }

    /// Non-positive values fall back to the default TTL.
    pub fn with_session_ttl_minutes(mut self, minutes: i64) -> Self {
        let minutes = if minutes > 0 { minutes } else { DEFAULT_SESSION_TTL_MINUTES };
        self.session_ttl = chrono::Duration::minutes(minutes);
        self
    }

    pub fn with_default_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.default_task_list = task_list.into();
        self
    }

    /// Returns the bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            automation_delay: Duration::from_millis(DEFAULT_AUTOMATION_DELAY_MS),
            session_ttl: chrono::Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            default_task_list: DEFAULT_TASK_LIST.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.automation_delay, Duration::from_millis(600));
        assert_eq!(config.session_ttl, chrono::Duration::minutes(60));
        assert_eq!(config.default_task_list, "AFC-1");
    }

    #[test]
    fn test_app_config_builders() {
        let config = AppConfig::new("0.0.0.0", 8080)
            .with_automation_delay_ms(0)
            .with_session_ttl_minutes(5)
            .with_default_task_list("AFC-3");

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.automation_delay, Duration::ZERO);
        assert_eq!(config.session_ttl, chrono::Duration::minutes(5));
        assert_eq!(config.default_task_list, "AFC-3");
    }

    #[test]
    fn test_non_positive_ttl_falls_back() {
        let config = AppConfig::default().with_session_ttl_minutes(0);
        assert_eq!(config.session_ttl, chrono::Duration::minutes(DEFAULT_SESSION_TTL_MINUTES));
    }
}
