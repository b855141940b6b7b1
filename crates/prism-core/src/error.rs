// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for PRISM.
//!
//! The hierarchy mirrors the bridge's failure taxonomy:
//!
//! ```text
//! BridgeError (root)
//! ├── ConfigError  - top-level config and PLC list (fatal at startup)
//! ├── DeviceError  - per-device failures (recorded, retried next tick)
//! └── ServerError  - Modbus listener failures (bind is fatal)
//! ```
//!
//! Per-device errors never terminate the process; they are written into the
//! device record and retried by the reconciliation loop. Wire-level Modbus
//! problems are not errors at all: they are exception responses.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// BridgeError - Root Error Type
// =============================================================================

/// The root error type for PRISM.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-device error.
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Modbus server error.
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

impl BridgeError {
    /// Returns `true` if this error should terminate startup.
    ///
    /// Configuration problems and a failed Modbus bind are fatal; everything
    /// reachable after startup is recorded on a device and retried.
    pub fn is_fatal(&self) -> bool {
        match self {
            BridgeError::Config(_) => true,
            BridgeError::Server(e) => e.is_fatal(),
            BridgeError::Device(_) => false,
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::Config(_) => "config",
            BridgeError::Device(_) => "device",
            BridgeError::Server(_) => "server",
        }
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration file.
    #[error("Failed to parse config file '{path}': {message}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The PLC list produced no usable devices.
    #[error("PLC list '{path}' contains no usable devices")]
    EmptyPlcList {
        /// Path to the PLC list file.
        path: PathBuf,
    },
}

impl ConfigError {
    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// DeviceError
// =============================================================================

/// Per-device errors, recorded on the device record and retried.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Tag file could not be read.
    #[error("Failed to read tag file '{path}': {message}")]
    TagFile {
        /// Path to the tag file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Tag file parsed but produced no usable rows.
    #[error("Tag file '{path}' contains no usable tags")]
    EmptyData {
        /// Path to the tag file.
        path: PathBuf,
    },

    /// Endpoint discovery against the upstream failed.
    #[error("Endpoint discovery for '{endpoint}' failed: {message}")]
    Discovery {
        /// The endpoint URL.
        endpoint: String,
        /// Error message.
        message: String,
    },

    /// No endpoint matched the configured security policy and mode.
    #[error("No endpoint matches {policy}/{mode}; server offers: {offered}")]
    NoMatchingEndpoint {
        /// Requested security policy.
        policy: String,
        /// Requested security mode.
        mode: String,
        /// Capability summary of what the server offers.
        offered: String,
    },

    /// Session connect failed.
    #[error("Failed to connect to '{endpoint}': {message}")]
    Connect {
        /// The endpoint URL.
        endpoint: String,
        /// Error message.
        message: String,
    },

    /// The connect probe (server-time read) failed.
    #[error("Liveness probe failed: {message}")]
    Probe {
        /// Error message.
        message: String,
    },

    /// Subscription creation or maintenance failed.
    #[error("Subscription error: {message}")]
    Subscription {
        /// Error message.
        message: String,
    },

    /// The device has no nodes to subscribe.
    #[error("No nodes configured for subscription")]
    NoNodes,
}

impl DeviceError {
    /// Creates a tag-file error.
    pub fn tag_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::TagFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an empty-data error.
    pub fn empty_data(path: impl Into<PathBuf>) -> Self {
        Self::EmptyData { path: path.into() }
    }

    /// Creates a discovery error.
    pub fn discovery(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a connect error.
    pub fn connect(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a probe error.
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }

    /// Creates a subscription error.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }
}

// =============================================================================
// ServerError
// =============================================================================

/// Modbus slave engine errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the TCP listener.
    #[error("Failed to bind Modbus listener on {address}: {source}")]
    Bind {
        /// The bind address.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to accept a client connection.
    #[error("Failed to accept connection: {source}")]
    Accept {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ServerError {
    /// Creates a bind error.
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Returns `true` if the listener cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ServerError::Bind { .. })
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// A Result type with [`BridgeError`].
pub type BridgeResult<T> = Result<T, BridgeError>;

/// A Result type with [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A Result type with [`DeviceError`].
pub type DeviceResult<T> = Result<T, DeviceError>;

/// A Result type with [`ServerError`].
pub type ServerResult<T> = Result<T, ServerError>;

// =============================================================================
// Tests
// =============================================================================
