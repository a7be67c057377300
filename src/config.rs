use crate::payments::providers::halk::HalkConfig;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "config/halk";
pub const ENV_PREFIX: &str = "HALK";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
    pub gateway: HalkConfig,
    pub database: Option<DatabaseConfig>,
    pub redis: Option<RedisConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: "development".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    /// Lifetime of a pending-redirect marker
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_pending_ttl_secs() -> u64 {
    3600
}

impl AppConfig {
    /// Load from `config/halk.{toml,yaml,json}` (optional) and `HALK__*` variables
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(file: impl AsRef<Path>) -> Result<Self> {
        let file = file.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Configuration has missing or malformed values")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        let gateway = &self.gateway;
        if gateway.client_id.trim().is_empty() {
            return Err(anyhow!("gateway.client_id cannot be empty"));
        }

        if gateway.store_key.trim().is_empty() {
            return Err(anyhow!("gateway.store_key cannot be empty"));
        }

        if gateway.status_query
            && (gateway.username.trim().is_empty() || gateway.password.trim().is_empty())
        {
            return Err(anyhow!(
                "gateway.username and gateway.password are required when status_query is enabled"
            ));
        }

        if !gateway.site_url.starts_with("http://") && !gateway.site_url.starts_with("https://") {
            return Err(anyhow!(
                "gateway.site_url must be an absolute http(s) URL, got {}",
                gateway.site_url
            ));
        }

        if gateway.currency_code.len() != 3 || !gateway.currency_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(anyhow!(
                "gateway.currency_code must be a 3-digit ISO 4217 code, got {}",
                gateway.currency_code
            ));
        }

        if gateway.refresh_time == 0 {
            return Err(anyhow!("gateway.refresh_time must be greater than 0"));
        }

        if !gateway.order_received_path.contains("{order_id}") {
            return Err(anyhow!(
                "gateway.order_received_path must contain the {{order_id}} placeholder"
            ));
        }

        // Production must not talk to the integration environment
        if self.server.environment == "production" && gateway.testing_mode {
            return Err(anyhow!("gateway.testing_mode cannot be enabled in production"));
        }

        if let Some(database) = &self.database {
            if database.url.trim().is_empty() {
                return Err(anyhow!("database.url cannot be empty"));
            }
            if database.max_connections == 0 {
                return Err(anyhow!("database.max_connections must be greater than 0"));
            }
        }

        if let Some(redis) = &self.redis {
            if redis.url.trim().is_empty() {
                return Err(anyhow!("redis.url cannot be empty"));
            }
        }

        Ok(())
    }
}
