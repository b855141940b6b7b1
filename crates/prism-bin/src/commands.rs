// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command dispatch.

use tracing::info;

use prism_bridge::catalog::load_tag_file;
use prism_bridge::plc::load_plc_list;
use prism_config::load_config;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;
use crate::logging::init_logging;
use crate::runtime::BridgeRuntime;

/// Executes the selected command.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => run(&cli).await,
        Commands::Validate => validate(&cli),
        Commands::Version => {
            version();
            Ok(())
        }
    }
}

/// Starts the bridge.
async fn run(cli: &Cli) -> BinResult<()> {
    let config = load_config(&cli.config)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, cli.log_format, config.logging.file.as_deref());

    BridgeRuntime::new(config).run().await
}

/// Validates the configuration, PLC list, and tag files offline.
fn validate(cli: &Cli) -> BinResult<()> {
    let level = cli.log_level.clone().unwrap_or_else(|| "warn".to_string());
    init_logging(&level, cli.log_format, None);

    let config = load_config(&cli.config)?;
    println!("config: ok ({})", cli.config.display());

    let entries = load_plc_list(&config.devices.directory)?;
    println!(
        "plc list: ok ({} device{})",
        entries.len(),
        if entries.len() == 1 { "" } else { "s" }
    );

    let mut problems = 0usize;
    for entry in &entries {
        match load_tag_file(&entry.tag_file) {
            Ok(catalog) => {
                println!(
                    "  {} -> unit {}, {} tag{} ({})",
                    entry.name,
                    entry.unit_id,
                    catalog.len(),
                    if catalog.len() == 1 { "" } else { "s" },
                    entry.config.endpoint,
                );
            }
            Err(e) => {
                problems += 1;
                println!("  {} -> PROBLEM: {}", entry.name, e);
            }
        }
    }

    if problems > 0 {
        println!("{} device(s) with problems", problems);
    } else {
        println!("all devices ok");
    }
    Ok(())
}

/// Prints version information.
fn version() {
    println!("prism {}", prism_core::VERSION);
    info!(version = prism_core::VERSION, "version requested");
}
