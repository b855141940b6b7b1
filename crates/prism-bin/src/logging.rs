// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! Structured logging via the `tracing` ecosystem. The configured log file,
//! when present, replaces stdout as the writer; ANSI colors are only used
//! on interactive terminals.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormat;

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the logging subsystem.
///
/// * `level` - default level when `RUST_LOG` is unset
/// * `format` - text, json, or compact
/// * `file` - log file path; `None` logs to stdout
///
/// A file that cannot be opened falls back to stdout with a note on
/// stderr; losing the log destination must not take the bridge down.
pub fn init_logging(level: &str, format: LogFormat, file: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level))
        .add_directive("tokio=info".parse().expect("static directive"))
        .add_directive("opcua=warn".parse().expect("static directive"));

    let writer = file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Arc::new(file)),
            Err(e) => {
                eprintln!("prism: cannot open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    match (format, writer) {
        (LogFormat::Text, Some(writer)) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true).with_ansi(false).with_writer(writer))
                .init();
        }
        (LogFormat::Text, None) => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true).with_ansi(is_terminal))
                .init();
        }
        (LogFormat::Json, Some(writer)) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        (LogFormat::Json, None) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        (LogFormat::Compact, Some(writer)) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_target(false).with_ansi(false).with_writer(writer))
                .init();
        }
        (LogFormat::Compact, None) => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_target(false).with_ansi(is_terminal))
                .init();
        }
    }
}
