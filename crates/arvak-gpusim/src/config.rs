//! Simulator configuration.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with `ARVAK_GPUSIM_` prefix)
//!
//! Environment variables take precedence over the file, which takes
//! precedence over defaults.

use std::path::Path;

use arvak_device::Device;
use arvak_device::device::DEFAULT_CAPACITY_BYTES;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gates::cache::DEFAULT_CACHE_ENTRIES;
use crate::kernel::DEFAULT_PARALLEL_THRESHOLD;

/// Everything needed to stand up a state vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Accelerator identifier.
    #[serde(default)]
    pub device_id: u32,

    /// Device memory capacity in bytes.
    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: usize,

    /// Allowed `|Σ|a_i|² - 1|` before sampling refuses; the precision
    /// default when unset.
    #[serde(default)]
    pub norm_tolerance: Option<f64>,

    /// Fixed sampling seed; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Largest register accepted.
    #[serde(default = "default_max_qubits")]
    pub max_qubits: usize,

    /// Register width from which kernels run in parallel.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Bound on memoised gate matrices.
    #[serde(default = "default_gate_cache_entries")]
    pub gate_cache_entries: usize,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_memory_limit() -> usize {
    DEFAULT_CAPACITY_BYTES
}

fn default_max_qubits() -> usize {
    30
}

fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

fn default_gate_cache_entries() -> usize {
    DEFAULT_CACHE_ENTRIES
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            device_id: 0,
            memory_limit_bytes: default_memory_limit(),
            norm_tolerance: None,
            seed: None,
            max_qubits: default_max_qubits(),
            parallel_threshold: default_parallel_threshold(),
            gate_cache_entries: default_gate_cache_entries(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: SimulatorConfig =
            serde_yaml_ng::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Load with the following precedence:
    /// 1. Environment variable overrides
    /// 2. File, if provided
    /// 3. Defaults
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `ARVAK_GPUSIM_*` variables that are set and parse.
    fn merge_env(mut self) -> Self {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.parse().ok())
        }

        if let Some(v) = parsed("ARVAK_GPUSIM_DEVICE_ID") {
            self.device_id = v;
        }
        if let Some(v) = parsed("ARVAK_GPUSIM_MEMORY_LIMIT") {
            self.memory_limit_bytes = v;
        }
        if let Some(v) = parsed("ARVAK_GPUSIM_NORM_TOLERANCE") {
            self.norm_tolerance = Some(v);
        }
        if let Some(v) = parsed("ARVAK_GPUSIM_SEED") {
            self.seed = Some(v);
        }
        if let Some(v) = parsed("ARVAK_GPUSIM_MAX_QUBITS") {
            self.max_qubits = v;
        }
        if let Some(v) = parsed("ARVAK_GPUSIM_PARALLEL_THRESHOLD") {
            self.parallel_threshold = v;
        }
        if let Ok(v) = std::env::var("ARVAK_GPUSIM_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("ARVAK_GPUSIM_LOG_FORMAT") {
            self.logging.format = v;
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_qubits == 0 || self.max_qubits >= usize::BITS as usize - 4 {
            return Err(ConfigError::Invalid(format!(
                "max_qubits must be in 1..{}, got {}",
                usize::BITS - 4,
                self.max_qubits
            )));
        }
        if self.memory_limit_bytes == 0 {
            return Err(ConfigError::Invalid(
                "memory_limit_bytes must be greater than 0".to_string(),
            ));
        }
        if let Some(tol) = self.norm_tolerance {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "norm_tolerance must be a positive number, got {tol}"
                )));
            }
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::Invalid(format!("Invalid log level: {other}")));
            }
        }
        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::Invalid(format!("Invalid log format: {other}")));
            }
        }

        Ok(())
    }

    /// The device this configuration describes.
    pub fn device(&self) -> Device {
        Device::with_capacity(self.device_id, self.memory_limit_bytes)
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Invalid(String),
}
