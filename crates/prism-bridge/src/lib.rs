// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # prism-bridge
//!
//! Device lifecycle and value projection for the PRISM protocol bridge.
//!
//! This crate connects the two protocol crates: it loads per-device tag
//! catalogs, drives each upstream device through its lifecycle state
//! machine, and projects incoming OPC UA data changes into the Modbus
//! register banks.
//!
//! - **catalog**: tab-separated tag files mapping node-ids to Modbus
//!   destinations
//! - **plc**: the `plc.tsv` device list
//! - **projector**: typed value → register-run decomposition
//! - **device**: per-device records and guarded state transitions
//! - **reconcile**: the periodic loop advancing every device
//! - **subscribe**: one live-subscription task per connected device

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod device;
pub mod plc;
pub mod projector;
pub mod reconcile;
pub mod subscribe;

pub use catalog::{load_tag_file, Tag, TagCatalog};
pub use device::{DeviceRecord, SharedDevice};
pub use plc::{load_plc_list, PlcEntry, PLC_LIST_FILE};
pub use reconcile::Reconciler;
