// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Binary-level errors and exit handling.
//!
//! Everything that reaches this level is fatal: configuration failures, an
//! empty PLC list, or a failed Modbus bind. Per-device problems never
//! propagate here; they live on the device records.

use thiserror::Error;

use prism_core::error::{ConfigError, ServerError};

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration problem (bad config file, empty PLC list).
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Modbus server problem (bind failure).
    #[error("{0}")]
    Server(#[from] ServerError),
}

/// A Result type with [`BinError`].
pub type BinResult<T> = Result<T, BinError>;

/// Reports a fatal error and terminates with a non-zero status.
pub fn report_error_and_exit(error: BinError) -> ! {
    tracing::error!(error = %error, "fatal error");
    eprintln!("prism: {}", error);
    std::process::exit(1);
}
