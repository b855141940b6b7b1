// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # prism-core
//!
//! Core abstractions and shared types for the PRISM protocol bridge.
//!
//! PRISM mirrors values from upstream OPC UA servers into Modbus TCP
//! register banks. This crate provides the types that cross crate
//! boundaries:
//!
//! - **Types**: `UnitId`, `Value`, `DeviceStatus`
//! - **Error**: Unified error hierarchy
//!
//! ## Example
//!
//! ```rust
//! use prism_core::types::{UnitId, Value, DeviceStatus};
//!
//! let unit = UnitId::new(17).unwrap();
//! assert_eq!(unit.get(), 17);
//!
//! let value = Value::Float32(21.5);
//! assert_eq!(value.type_name(), "float32");
//!
//! assert!(DeviceStatus::Configured < DeviceStatus::Subscribed);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod types;

pub use error::{
    BridgeError, BridgeResult, ConfigError, ConfigResult, DeviceError, DeviceResult, ServerError,
    ServerResult,
};
pub use types::{DeviceStatus, UnitId, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
