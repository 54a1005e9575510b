use serde::{Deserialize, Serialize};
use std::path::Path;

use super::blocking::BlockingConfig;
use super::errors::ConfigError;
use super::health::HealthConfig;
use super::logging::LoggingConfig;
use super::metrics::MetricsConfig;
use super::policy::PolicyConfig;
use super::server::ServerConfig;
use super::upstream::UpstreamConfig;
use crate::decision::PolicyAction;

const LOCAL_CONFIG_PATH: &str = "warden-dns.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/warden-dns/config.toml";

/// Main configuration structure for Warden DNS
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener address and lifecycle timeouts
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream resolvers, pooling and retry policy
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub blocking: BlockingConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. warden-dns.toml in current directory
    /// 3. /etc/warden-dns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path.map(str::to_string).or_else(Self::get_config_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.dns_port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }

        if self.upstream.resolvers.is_empty() {
            return Err(ConfigError::Validation(
                "No upstream resolvers configured".to_string(),
            ));
        }

        for resolver in &self.upstream.resolvers {
            if resolver.address.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Resolver '{}' has no address",
                    resolver.id
                )));
            }
        }

        if self.upstream.tcp_pool_size == 0 {
            return Err(ConfigError::Validation(
                "upstream.tcp_pool_size must be at least 1".to_string(),
            ));
        }

        if self.upstream.max_retries == 0 {
            return Err(ConfigError::Validation(
                "upstream.max_retries must be at least 1".to_string(),
            ));
        }

        if self.metrics.slice_secs == 0 || self.metrics.slice_secs > self.metrics.window_secs {
            return Err(ConfigError::Validation(format!(
                "metrics.slice_secs must be between 1 and window_secs ({})",
                self.metrics.window_secs
            )));
        }

        for rule in &self.policy.rules {
            if rule.action == PolicyAction::Redirect && rule.redirect_ip.is_none() {
                return Err(ConfigError::Validation(format!(
                    "Policy rule '{}' redirects without a redirect_ip",
                    rule.id
                )));
            }
        }

        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        [LOCAL_CONFIG_PATH, SYSTEM_CONFIG_PATH]
            .into_iter()
            .find(|p| Path::new(p).exists())
            .map(str::to_string)
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}
