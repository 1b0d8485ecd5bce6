//! Configuration management for Tollgate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, TollgateError};

/// Main configuration for the Tollgate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for TollgateConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Requests per window for any key without an explicit override
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Shared window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Per-token limit overrides
    #[serde(default)]
    pub token_overrides: HashMap<String, u32>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            window_ms: default_window_ms(),
            token_overrides: HashMap::new(),
        }
    }
}

fn default_limit() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    1000
}

impl LimitsConfig {
    /// The window length as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl TollgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TollgateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| TollgateError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Reject limits and windows no request could ever satisfy.
    ///
    /// A zero limit or zero window is a configuration mistake, caught
    /// here at load time rather than surfacing as every request being
    /// rejected.
    pub fn validate(&self) -> Result<()> {
        if self.limits.default_limit == 0 {
            return Err(TollgateError::Config(
                "default_limit must be at least 1".to_string(),
            ));
        }
        if self.limits.window_ms == 0 {
            return Err(TollgateError::Config(
                "window_ms must be at least 1".to_string(),
            ));
        }
        for (token, limit) in &self.limits.token_overrides {
            if *limit == 0 {
                return Err(TollgateError::Config(format!(
                    "token override '{}' must have a limit of at least 1",
                    token
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TollgateConfig::default();
        assert_eq!(config.limits.default_limit, 5);
        assert_eq!(config.limits.window(), Duration::from_secs(1));
        assert!(config.limits.token_overrides.is_empty());
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  listen_addr: "127.0.0.1:9000"
limits:
  default_limit: 5
  window_ms: 1000
  token_overrides:
    free: 2
    premium: 100
"#;
        let config: TollgateConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.listen_addr.port(), 9000);
        assert_eq!(config.limits.default_limit, 5);
        assert_eq!(config.limits.token_overrides["free"], 2);
        assert_eq!(config.limits.token_overrides["premium"], 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
limits:
  default_limit: 20
"#;
        let config: TollgateConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.limits.default_limit, 20);
        assert_eq!(config.limits.window_ms, 1000);
        assert_eq!(config.server.listen_addr.port(), 8080);
    }

    #[test]
    fn test_zero_default_limit_rejected() {
        let mut config = TollgateConfig::default();
        config.limits.default_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = TollgateConfig::default();
        config.limits.window_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_override_rejected() {
        let mut config = TollgateConfig::default();
        config
            .limits
            .token_overrides
            .insert("broken".to_string(), 0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
