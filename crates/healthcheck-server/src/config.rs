//! Configuration loading and validation for the healthcheck server

use healthcheck::{CategoryTimeouts, EngineConfig};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "HEALTHCHECK_CONFIG";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl From<ConfigError> for common::Error {
    fn from(err: ConfigError) -> Self {
        common::Error::config(err)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub probes: Vec<ProbeSettings>,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.engine.validate()?;
        for probe in &self.probes {
            probe.validate()?;
        }
        Ok(())
    }
}

/// Transport settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerSettings {
    #[validate(custom = "validate_listen_addr")]
    pub listen_addr: String,
}

/// Engine settings, converted into [`EngineConfig`]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_category_timeouts"))]
pub struct EngineSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_timeout")]
    pub default_timeout: Duration,

    #[serde(with = "humantime_serde")]
    pub startup_timeout: Option<Duration>,

    #[serde(with = "humantime_serde")]
    pub liveness_timeout: Option<Duration>,

    #[serde(with = "humantime_serde")]
    pub readiness_timeout: Option<Duration>,

    #[validate(range(min = 1, max = 1024))]
    pub max_concurrency: Option<usize>,
}

/// A probe declared in the config file
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_probe_timeout"))]
pub struct ProbeSettings {
    #[validate(length(min = 1))]
    pub name: String,

    /// Category name; parsed at registration time
    pub category: String,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    #[serde(flatten)]
    pub check: CheckSettings,
}

/// Probe-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CheckSettings {
    Tcp {
        address: String,
    },
    Http {
        url: String,
        #[serde(default = "default_http_method")]
        method: String,
        #[serde(default)]
        expected_codes: Vec<u16>,
    },
    Dns {
        query: String,
        #[serde(default)]
        expected_ips: Vec<IpAddr>,
    },
}

fn default_http_method() -> String {
    "GET".to_string()
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub service_name: String,
    pub otlp_endpoint: String,
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(5),
            startup_timeout: None,
            liveness_timeout: None,
            readiness_timeout: None,
            max_concurrency: None,
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "healthcheck-server".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
        }
    }
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            default_timeout: self.default_timeout,
            timeouts: CategoryTimeouts {
                startup: self.startup_timeout,
                liveness: self.liveness_timeout,
                readiness: self.readiness_timeout,
            },
            max_concurrency: self.max_concurrency,
        }
    }
}

// Custom validators

fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    addr.trim()
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("listen_addr_invalid"))
}

fn validate_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if millis < 1 || millis > 300_000 {
        return Err(ValidationError::new("timeout_out_of_range"));
    }
    Ok(())
}

fn validate_category_timeouts(engine: &EngineSettings) -> Result<(), ValidationError> {
    [
        engine.startup_timeout,
        engine.liveness_timeout,
        engine.readiness_timeout,
    ]
    .iter()
    .flatten()
    .try_for_each(validate_timeout)
}

fn validate_probe_timeout(probe: &ProbeSettings) -> Result<(), ValidationError> {
    probe.timeout.as_ref().map_or(Ok(()), validate_timeout)
}

// Configuration loading implementation

impl Config {
    /// Load configuration from `HEALTHCHECK_CONFIG` or the default search paths
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path));
            }
            tracing::info!("Loading configuration from {}: {}", CONFIG_ENV, path.display());
            return Self::load_from_file(&path);
        }

        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/healthcheck/healthcheck-server.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./healthcheck-server.yaml"));

        paths.into_iter().find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/healthcheck/healthcheck-server.yaml"))
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }
}
