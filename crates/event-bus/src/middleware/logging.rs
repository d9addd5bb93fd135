//! # Logging Middleware
//!
//! Reference [`EventLogger`]. Console output is rendered through `tracing`
//! at the matching level; server output is POSTed as JSON to the configured
//! endpoint on the current tokio runtime. Remote failures are logged locally
//! and never propagated.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info};

use crate::error::ConfigError;
use crate::ports::{Direction, EventLogger, LogLevel};

/// Where log entries go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    Server,
    Both,
}

impl LogOutput {
    #[must_use]
    pub fn console(&self) -> bool {
        matches!(self, Self::Console | Self::Both)
    }

    #[must_use]
    pub fn server(&self) -> bool {
        matches!(self, Self::Server | Self::Both)
    }
}

impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Console => "console",
            Self::Server => "server",
            Self::Both => "both",
        })
    }
}

impl FromStr for LogOutput {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "server" => Ok(Self::Server),
            "both" => Ok(Self::Both),
            other => Err(ConfigError::UnknownLogOutput(other.to_string())),
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    pub enable_logging: bool,
    /// Levels that are let through; everything else is dropped.
    pub log_levels: Vec<LogLevel>,
    pub output: LogOutput,
    /// Endpoint for server output.
    pub server_url: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            log_levels: LogLevel::ALL.to_vec(),
            output: LogOutput::Console,
            server_url: None,
        }
    }
}

impl LoggingConfig {
    /// A configuration that logs nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enable_logging: false,
            ..Self::default()
        }
    }

    /// Whether an entry at `level` passes the configuration.
    #[must_use]
    pub fn allows(&self, level: LogLevel) -> bool {
        self.enable_logging && self.log_levels.contains(&level)
    }
}

/// Console/server logging sink.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    config: LoggingConfig,
    client: reqwest::Client,
}

impl LoggingMiddleware {
    pub fn new(config: LoggingConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    fn send_to_server(&self, message: String, payload: String) {
        let Some(url) = self.config.server_url.clone() else {
            error!("Server logging is enabled, but no server URL is configured");
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(url = %url, "Server logging requires a tokio runtime; entry dropped");
            return;
        };

        let request = self
            .client
            .post(url.clone())
            .json(&json!({ "message": message, "payload": payload }));

        runtime.spawn(async move {
            let result = request
                .send()
                .await
                .and_then(reqwest::Response::error_for_status);
            if let Err(e) = result {
                error!(url = %url, error = %e, "Failed to log to server");
            }
        });
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new(LoggingConfig::default())
    }
}

impl EventLogger for LoggingMiddleware {
    fn handle(&self, event_name: &str, payload: &Value, direction: Direction, level: LogLevel) {
        if !self.config.allows(level) {
            return;
        }

        let timestamp = chrono::Utc::now().to_rfc3339();
        let direction_tag = direction.as_str().to_ascii_uppercase();
        let message = format!("[{timestamp}] [{level}] [{direction_tag}] Event Type: {event_name}");

        if self.config.output.console() {
            match level {
                LogLevel::Info => info!(event = event_name, %direction, %payload, "{message}"),
                LogLevel::Debug => debug!(event = event_name, %direction, %payload, "{message}"),
                LogLevel::Error => error!(event = event_name, %direction, %payload, "{message}"),
            }
        }

        if self.config.output.server() {
            let payload_line = format!("[{timestamp}] Payload: {payload}");
            self.send_to_server(message, payload_line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ErrorCapture;

    #[test]
    fn test_default_config_allows_all_levels() {
        let config = LoggingConfig::default();
        for level in LogLevel::ALL {
            assert!(config.allows(level));
        }
        assert_eq!(config.output, LogOutput::Console);
    }

    #[test]
    fn test_disabled_config_allows_nothing() {
        let config = LoggingConfig::disabled();
        assert!(!config.allows(LogLevel::Error));
    }

    #[test]
    fn test_level_allow_list() {
        let config = LoggingConfig {
            log_levels: vec![LogLevel::Error],
            ..LoggingConfig::default()
        };
        assert!(config.allows(LogLevel::Error));
        assert!(!config.allows(LogLevel::Debug));
    }

    #[test]
    fn test_output_parse() {
        assert_eq!("BOTH".parse::<LogOutput>().unwrap(), LogOutput::Both);
        assert!(LogOutput::Both.console() && LogOutput::Both.server());
        assert!(!LogOutput::Server.console());
        assert!("file".parse::<LogOutput>().is_err());
    }

    fn server_logger(output: LogOutput, server_url: Option<&str>) -> LoggingMiddleware {
        LoggingMiddleware::new(LoggingConfig {
            output,
            server_url: server_url.map(str::to_string),
            ..LoggingConfig::default()
        })
    }

    #[test]
    fn test_server_output_without_url_logs_error_once_per_entry() {
        let capture = ErrorCapture::default();
        let _guard = capture.install();
        let logger = server_logger(LogOutput::Server, None);

        logger.handle("OrderCreated", &Value::Null, Direction::Emit, LogLevel::Info);
        let messages = capture.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("no server URL"));

        logger.handle("OrderCreated", &Value::Null, Direction::Emit, LogLevel::Debug);
        assert_eq!(capture.messages().len(), 2);
    }

    #[test]
    fn test_server_output_without_runtime_logs_error() {
        let capture = ErrorCapture::default();
        let _guard = capture.install();
        let logger = server_logger(LogOutput::Both, Some("http://127.0.0.1:9/logs"));

        logger.handle("OrderCreated", &Value::Null, Direction::Emit, LogLevel::Info);
        let messages = capture.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("requires a tokio runtime"));
    }

    #[test]
    fn test_filtered_level_skips_server() {
        let capture = ErrorCapture::default();
        let _guard = capture.install();
        let logger = LoggingMiddleware::new(LoggingConfig {
            log_levels: vec![LogLevel::Error],
            output: LogOutput::Server,
            ..LoggingConfig::default()
        });

        logger.handle("OrderCreated", &Value::Null, Direction::Emit, LogLevel::Info);
        assert!(capture.messages().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_logged_not_propagated() {
        let capture = ErrorCapture::default();
        let _guard = capture.install();
        let logger = server_logger(LogOutput::Server, Some("http://127.0.0.1:9/logs"));

        logger.handle("OrderCreated", &Value::Null, Direction::Emit, LogLevel::Error);
        for _ in 0..200 {
            if !capture.messages().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(capture.messages(), vec!["Failed to log to server".to_string()]);
    }
}
