//! Session configuration.

use eva_core::{ConfigError, ParameterDescriptor, ParameterSpace};
use eva_strategy::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::transport::{TcpConnector, DEFAULT_MAX_FRAME_LEN};

/// Default optimizer host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default optimizer port.
pub const DEFAULT_PORT: u16 = 51234;

/// Everything needed to run a session against a remote optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Optimizer host name or address
    pub host: String,
    /// Optimizer port
    pub port: u16,
    /// Largest accepted frame in bytes
    pub max_frame_len: usize,
    /// Method and population settings
    pub strategy: StrategyConfig,
    /// Tunable parameters, in wire order
    pub parameters: Vec<ParameterDescriptor>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            strategy: StrategyConfig::default(),
            parameters: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Read and validate a JSON configuration file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Unreadable(format!("{}: {}", path.display(), e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Unreadable(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Unreadable(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::Unreadable(format!("{}: {}", path.display(), e)))
    }

    /// Check connection settings, strategy settings and the parameter space.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        self.strategy.validate()?;
        self.parameter_space()?;
        Ok(())
    }

    /// Resolve the parameter space.
    pub fn parameter_space(&self) -> Result<ParameterSpace, ConfigError> {
        ParameterSpace::new(self.parameters.clone())
    }

    /// TCP connector for the configured endpoint.
    pub fn connector(&self) -> TcpConnector {
        TcpConnector::new(self.host.trim(), self.port).with_max_frame_len(self.max_frame_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> SessionConfig {
        SessionConfig {
            parameters: vec![
                ParameterDescriptor::double_range("gain", 0.0, 1.0, 0.01),
                ParameterDescriptor::int_interval("window", 2, 64, 2),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 51234);
        assert_eq!(config.strategy.generations, -1);
    }

    #[test]
    fn test_empty_parameters_are_rejected() {
        assert_eq!(
            SessionConfig::default().validate().unwrap_err(),
            ConfigError::NoParameters
        );
    }

    #[test]
    fn test_missing_host() {
        let config = SessionConfig {
            host: "  ".to_string(),
            ..config()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigError::MissingHost);
    }

    #[test]
    fn test_zero_port() {
        let config = SessionConfig { port: 0, ..config() };
        assert_eq!(config.validate().unwrap_err(), ConfigError::InvalidPort(0));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let config = config();
        config.save_to_file(&path).unwrap();
        assert_eq!(SessionConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{
                "port": 6000,
                "strategy": { "method": "GA", "generations": 10 },
                "parameters": [
                    { "name": "taps", "type": "int_range", "min": 0, "max": 7, "step": 1 },
                    { "name": "enabled", "type": "value", "value_type": "bool" }
                ]
            }"#,
        )
        .unwrap();

        let config = SessionConfig::load_from_file(&path).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6000);
        assert_eq!(config.strategy.method, "GA");
        assert_eq!(config.strategy.individuals, 60);
        assert_eq!(config.parameter_space().unwrap().slot_count(), 2);
    }

    #[test]
    fn test_unreadable_file() {
        let dir = TempDir::new().unwrap();
        let err = SessionConfig::load_from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable(_)));
    }

    #[test]
    fn test_invalid_file_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "host: [").unwrap();
        assert!(matches!(
            SessionConfig::load_from_file(&path).unwrap_err(),
            ConfigError::Unreadable(_)
        ));
    }
}
