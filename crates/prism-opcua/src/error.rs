// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client errors.
//!
//! These cover the failure classes of the upstream path: discovery,
//! connect, the liveness probe read, and subscription management. They are
//! converted into per-device errors by the bridge and never escape the
//! reconciliation loop.

use thiserror::Error;

/// Errors produced by the OPC UA client layer.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Endpoint discovery failed.
    #[error("Endpoint discovery failed: {message}")]
    Discovery {
        /// Error message.
        message: String,
    },

    /// Session establishment failed.
    #[error("Connect failed: {message}")]
    Connect {
        /// Error message.
        message: String,
    },

    /// A value read failed.
    #[error("Read of '{node}' failed: {message}")]
    Read {
        /// The node that failed.
        node: String,
        /// Error message.
        message: String,
    },

    /// Subscription creation or node monitoring failed.
    #[error("Subscription error: {message}")]
    Subscription {
        /// Error message.
        message: String,
    },

    /// The session is not connected.
    #[error("Session is not connected")]
    NotConnected,

    /// A node identifier could not be parsed.
    #[error("Invalid node id '{node}'")]
    InvalidNodeId {
        /// The offending identifier.
        node: String,
    },
}

impl OpcUaError {
    /// Creates a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Creates a connect error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a read error.
    pub fn read(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Creates a subscription error.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Creates an invalid-node-id error.
    pub fn invalid_node_id(node: impl Into<String>) -> Self {
        Self::InvalidNodeId { node: node.into() }
    }
}

/// A Result type with [`OpcUaError`].
pub type OpcUaResult<T> = Result<T, OpcUaError>;
