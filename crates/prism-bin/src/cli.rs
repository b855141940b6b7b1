// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: start the bridge (default when no subcommand is given)
//! - `validate`: check the configuration, PLC list and tag files offline
//! - `version`: show version information

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// PRISM, an OPC UA to Modbus TCP mirroring bridge.
///
/// Maintains live subscriptions against upstream OPC UA servers and serves
/// the latest values to Modbus TCP masters from per-unit register banks.
#[derive(Parser, Debug)]
#[command(
    name = "prism",
    author = "Sylvex <contact@sylvex.io>",
    version = prism_core::VERSION,
    about = "OPC UA to Modbus TCP mirroring bridge",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "prism.toml",
        env = "PRISM_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, env = "PRISM_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "PRISM_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the bridge
    ///
    /// This is the default command when no subcommand is specified.
    Run,

    /// Validate the configuration without opening any connection
    ///
    /// Loads the top-level configuration, the PLC list, and every
    /// referenced tag file, reporting per-device problems.
    Validate,

    /// Show version information
    Version,
}

// =============================================================================
// LogFormat
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for log aggregation.
    Json,
    /// Minimal single-line output.
    Compact,
}

// =============================================================================
// Tests
// =============================================================================
