// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # prism-config
//!
//! Top-level configuration for the PRISM protocol bridge.
//!
//! The bridge is configured by one TOML file naming the log destination,
//! the directory holding the PLC list and tag files, the Modbus bind
//! address, and the reconciliation interval:
//!
//! ```toml
//! [logging]
//! file = "/var/log/prism/bridge.log"
//! level = "info"
//!
//! [devices]
//! directory = "/etc/prism/devices"
//!
//! [modbus]
//! host = "0.0.0.0"
//! port = 1502
//!
//! [reconcile]
//! interval_secs = 600
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use prism_config::load_config;
//!
//! let config = load_config("prism.toml").unwrap();
//! println!("serving on {}:{}", config.modbus.host, config.modbus.port);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod schema;

pub use schema::{
    load_config, load_config_str, BridgeConfig, DevicesConfig, LoggingConfig, ModbusConfig,
    ReconcileConfig,
};
