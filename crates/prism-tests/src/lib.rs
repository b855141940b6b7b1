// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # prism-tests
//!
//! Shared fixtures and mocks for the PRISM integration test suites.
//!
//! The `tests/` directory of this crate holds the end-to-end suites:
//!
//! - `integration_modbus`: golden wire frames against a live TCP server
//! - `integration_bridge`: the full ingest pipeline over a scripted
//!   OPC UA session

pub mod common;
