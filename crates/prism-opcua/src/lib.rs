// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # prism-opcua
//!
//! OPC UA client layer for the PRISM protocol bridge.
//!
//! This crate owns everything that speaks to an upstream OPC UA server:
//!
//! - **Types**: node identifiers, security policy/mode/auth enums with the
//!   normalization rules applied to PLC-list fields
//! - **Options**: endpoint selection and the ordered client option vector
//! - **Session**: the [`UaConnector`]/[`UaSession`] trait seam the bridge is
//!   written against, so tests run without a live server
//! - **Real**: the production connector backed by the `opcua` crate
//!
//! ## Example
//!
//! ```rust
//! use prism_opcua::types::{SecurityMode, SecurityPolicy, AuthMode};
//!
//! assert_eq!(SecurityPolicy::normalize("BASIC256sha256"), SecurityPolicy::Basic256Sha256);
//! assert_eq!(SecurityMode::normalize("signandencrypt"), SecurityMode::SignAndEncrypt);
//! assert_eq!(AuthMode::normalize("something-else"), AuthMode::Anonymous);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod options;
pub mod real;
pub mod session;
pub mod types;

pub use error::{OpcUaError, OpcUaResult};
pub use options::{assemble_options, capability_summary, ClientOption, EndpointInfo};
pub use real::OpcUaConnector;
pub use session::{DataChange, DataChangeHandler, SubscriptionHandle, UaConnector, UaSession};
pub use types::{AuthMode, NodeId, SecurityMode, SecurityPolicy, UaConfig};
