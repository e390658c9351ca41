//! Service configuration.
//!
//! An immutable configuration object built once at startup and passed
//! explicitly into each component: defaults, overlaid by an optional TOML
//! file, overlaid by `ADES_*` environment variables, overlaid by CLI flags
//! (applied in `main`). Nothing reads configuration globally at runtime, so
//! tests can substitute fake paths without process-wide side effects.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub schemas: SchemaConfig,
    pub converter: ConverterConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the service binds to
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Schema directory configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    /// Directory containing `submit.xsd` and `general.xsd`
    pub directory: PathBuf,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("schemas"),
        }
    }
}

/// Converter execution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConverterConfig {
    /// Directory containing the converter executables
    pub directory: PathBuf,
    /// Upper bound on a single conversion, in seconds
    pub timeout_seconds: u64,
    /// Ceiling on concurrently running converter subprocesses
    pub max_concurrent: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("converters"),
            timeout_seconds: 60,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from defaults, an optional TOML file, and the
    /// process environment, in that order.
    pub fn load(file: Option<&Path>, env: &impl EnvProvider) -> ConfigResult<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file; absent sections fall back to
    /// defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Overlay `ADES_*` environment variables.
    pub fn apply_env(&mut self, env: &impl EnvProvider) -> ConfigResult<()> {
        if let Some(addr) = env.get("ADES_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(dir) = env.get("ADES_XSD_DIR") {
            self.schemas.directory = PathBuf::from(dir);
        }
        if let Some(dir) = env.get("ADES_CONVERTER_DIR") {
            self.converter.directory = PathBuf::from(dir);
        }
        if let Some(value) = env.get("ADES_CONVERTER_TIMEOUT_SECONDS") {
            self.converter.timeout_seconds =
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "converter.timeout_seconds".to_string(),
                        value,
                        reason: "must be a positive integer".to_string(),
                    })?;
        }
        if let Some(value) = env.get("ADES_CONVERTER_MAX_CONCURRENT") {
            self.converter.max_concurrent =
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "converter.max_concurrent".to_string(),
                        value,
                        reason: "must be a positive integer".to_string(),
                    })?;
        }
        Ok(())
    }

    /// Reject values no deployment can mean.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.converter.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "converter.timeout_seconds".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.converter.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "converter.max_concurrent".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
