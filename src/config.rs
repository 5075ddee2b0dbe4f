use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated. Any origin when unset.
    pub cors_origins: Option<String>,

    /// Reported by the health endpoint
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Remote code execution endpoint. `/api/v1/run` answers 503 when unset.
    pub execution_url: Option<String>,

    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,

    /// Most recent chat entries kept per room
    #[serde(default = "default_chat_history_limit")]
    pub chat_history_limit: usize,

    /// How long an empty room keeps its document, chat and language
    #[serde(default = "default_room_retention_secs")]
    pub room_retention_secs: u64,

    #[serde(default = "default_room_retention_capacity")]
    pub room_retention_capacity: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn room_retention(&self) -> Duration {
        Duration::from_secs(self.room_retention_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            cors_origins: None,
            service_name: default_service_name(),
            execution_url: None,
            execution_timeout_secs: default_execution_timeout_secs(),
            chat_history_limit: default_chat_history_limit(),
            room_retention_secs: default_room_retention_secs(),
            room_retention_capacity: default_room_retention_capacity(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5050
}

fn default_service_name() -> String {
    "interview-room".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_execution_timeout_secs() -> u64 {
    10
}

fn default_chat_history_limit() -> usize {
    500
}

fn default_room_retention_secs() -> u64 {
    600
}

fn default_room_retention_capacity() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_environment_pairs() {
        let vars = vec![
            ("PORT".to_string(), "6060".to_string()),
            ("CORS_ORIGINS".to_string(), "http://localhost:5173, https://example.org,".to_string()),
            ("CHAT_HISTORY_LIMIT".to_string(), "20".to_string()),
            ("SERVICE_NAME".to_string(), "relay-eu".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 6060);
        assert_eq!(config.chat_history_limit, 20);
        assert_eq!(config.service_name, "relay-eu");
        assert_eq!(config.room_retention_secs, 600);
        assert_eq!(
            config.cors_origin_list(),
            vec!["http://localhost:5173".to_string(), "https://example.org".to_string()]
        );
        assert_eq!(config.server_address(), "0.0.0.0:6060");
    }

    #[test]
    fn defaults_match_empty_environment() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        let default = Config::default();
        assert_eq!(config.port, default.port);
        assert_eq!(config.execution_url, None);
        assert!(config.cors_origin_list().is_empty());
        assert!(config.is_development());
    }
}
