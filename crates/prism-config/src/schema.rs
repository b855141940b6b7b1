// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema and loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use prism_core::error::{ConfigError, ConfigResult};

// =============================================================================
// BridgeConfig
// =============================================================================

/// The top-level bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Device directory configuration.
    pub devices: DevicesConfig,

    /// Modbus server configuration.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Reconciliation loop configuration.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl BridgeConfig {
    /// Validates field-level constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.devices.directory.as_os_str().is_empty() {
            return Err(ConfigError::validation(
                "devices.directory",
                "must not be empty",
            ));
        }
        if self.modbus.port == 0 {
            return Err(ConfigError::validation("modbus.port", "must be non-zero"));
        }
        if self.reconcile.interval_secs == 0 {
            return Err(ConfigError::validation(
                "reconcile.interval_secs",
                "must be non-zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log file path; empty logs to stdout.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Device directory configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DevicesConfig {
    /// Directory holding `plc.tsv` and the per-device tag files.
    pub directory: PathBuf,
}

/// Modbus server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModbusConfig {
    /// Bind host.
    #[serde(default = "default_modbus_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_modbus_port")]
    pub port: u16,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            host: default_modbus_host(),
            port: default_modbus_port(),
        }
    }
}

fn default_modbus_host() -> String {
    "0.0.0.0".to_string()
}

fn default_modbus_port() -> u16 {
    1502
}

/// Reconciliation loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Seconds between reconciliation ticks.
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
}

impl ReconcileConfig {
    /// Returns the interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval_secs(),
        }
    }
}

fn default_reconcile_interval_secs() -> u64 {
    600
}

// =============================================================================
// Loading
// =============================================================================

/// Loads and validates a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let config = parse_config(path, &content)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Parses and validates configuration from a string.
pub fn load_config_str(content: &str) -> ConfigResult<BridgeConfig> {
    parse_config(Path::new("<inline>"), content)
}

fn parse_config(path: &Path, content: &str) -> ConfigResult<BridgeConfig> {
    let config: BridgeConfig =
        toml::from_str(content).map_err(|e| ConfigError::parse(path, e.to_string()))?;
    config.validate()?;
    Ok(config)
}

// =============================================================================
// Tests
// =============================================================================
