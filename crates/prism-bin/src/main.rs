// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! PRISM, an OPC UA to Modbus TCP mirroring bridge.
//!
//! Main binary entry point. The bridge subscribes to values on upstream
//! OPC UA servers and serves the latest values to Modbus TCP masters from
//! per-unit register banks.

use clap::Parser;

use prism_bin::cli::Cli;
use prism_bin::commands;
use prism_bin::error::report_error_and_exit;

/// Application entry point.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(error) = commands::execute(cli).await {
        report_error_and_exit(error);
    }
}
