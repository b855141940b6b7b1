// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # prism-modbus
//!
//! Modbus TCP slave engine for the PRISM protocol bridge.
//!
//! This crate implements the downstream-facing half of the bridge:
//!
//! - **Frame**: MBAP wire codec: request decoding, data and exception
//!   response encoding
//! - **Bank**: per-unit register banks with independent reader/writer locks
//!   per table
//! - **Server**: TCP listener and per-connection request handlers
//!
//! The bank is the only state shared with the OPC UA ingest path: the
//! subscription callbacks write into it, the server reads out of it.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use prism_core::types::UnitId;
//! use prism_modbus::bank::RegisterBank;
//!
//! let bank = Arc::new(RegisterBank::new());
//! let unit = UnitId::new(1).unwrap();
//! bank.add_unit(unit);
//! bank.write_coil(unit, 100, true);
//!
//! let data = bank.read_coils(unit, 100, 1).unwrap();
//! assert_eq!(data, vec![0x01, 0x01]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bank;
pub mod frame;
pub mod server;

pub use bank::RegisterBank;
pub use frame::{Exception, RegisterKind, RequestFrame};
pub use server::ModbusServer;
