// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session abstraction.
//!
//! The bridge is written against the [`UaConnector`] and [`UaSession`]
//! traits rather than a concrete OPC UA library. The production connector
//! lives in [`crate::real`]; tests substitute in-memory fakes that script
//! endpoint lists and data changes.
//!
//! Data-change delivery is push-based: the subscription owns an
//! [`DataChangeHandler`] and invokes it from whatever thread the underlying
//! library publishes on. Handlers must therefore be cheap and must not
//! block; writing into the register bank qualifies, since its locks are
//! held only for map updates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use prism_core::types::Value;

use crate::error::OpcUaResult;
use crate::options::{ClientOption, EndpointInfo};
use crate::types::NodeId;

// =============================================================================
// DataChange
// =============================================================================

/// A value-change notification from a live subscription.
#[derive(Debug, Clone)]
pub struct DataChange {
    /// The node whose value changed.
    pub node: NodeId,

    /// The new value.
    pub value: Value,

    /// `false` when the server flagged the value with a bad status code;
    /// such changes are logged and dropped.
    pub status_good: bool,

    /// Timestamp assigned by the server, when available.
    pub server_timestamp: Option<DateTime<Utc>>,

    /// Timestamp assigned by the data source, when available.
    pub source_timestamp: Option<DateTime<Utc>>,
}

impl DataChange {
    /// Creates a good-status change with no timestamps.
    pub fn new(node: NodeId, value: Value) -> Self {
        Self {
            node,
            value,
            status_good: true,
            server_timestamp: None,
            source_timestamp: None,
        }
    }
}

// =============================================================================
// DataChangeHandler
// =============================================================================

/// Receiver for subscription notifications.
///
/// `on_data_change` runs on the publishing thread of the OPC UA library;
/// implementations must be `Send + Sync` and non-blocking.
pub trait DataChangeHandler: Send + Sync {
    /// Called for every delivered value change.
    fn on_data_change(&self, change: DataChange);

    /// Called when the subscription surfaces a transport-level error.
    ///
    /// Transient errors are handled by the library's auto-reconnect; this
    /// hook only records them, it does not tear anything down.
    fn on_subscription_error(&self, _message: String) {}
}

// =============================================================================
// SubscriptionHandle
// =============================================================================

/// Handle to a live subscription, owned by the device record while its
/// status is `Subscribed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    /// Client-side subscription identifier.
    pub id: u32,
}

impl SubscriptionHandle {
    /// Creates a handle.
    pub fn new(id: u32) -> Self {
        Self { id }
    }
}

// =============================================================================
// UaSession / UaConnector
// =============================================================================

/// An established session against one upstream server.
#[async_trait]
pub trait UaSession: Send + Sync {
    /// Reads the current value of a node.
    async fn read_value(&self, node: &NodeId) -> OpcUaResult<Value>;

    /// Creates a subscription seeded with one monitored node.
    ///
    /// The handler receives every data change published for nodes in this
    /// subscription, including ones added later via
    /// [`UaSession::add_node`].
    async fn subscribe(
        &self,
        publishing_interval: Duration,
        seed: &NodeId,
        handler: Arc<dyn DataChangeHandler>,
    ) -> OpcUaResult<SubscriptionHandle>;

    /// Adds another monitored node to an existing subscription.
    async fn add_node(&self, subscription: &SubscriptionHandle, node: &NodeId) -> OpcUaResult<()>;

    /// Deletes a subscription.
    async fn unsubscribe(&self, subscription: SubscriptionHandle) -> OpcUaResult<()>;

    /// Closes the session.
    async fn disconnect(&self);
}

/// Factory for sessions: endpoint discovery plus connect.
#[async_trait]
pub trait UaConnector: Send + Sync {
    /// Queries the server's endpoint list.
    async fn discover(&self, endpoint_url: &str) -> OpcUaResult<Vec<EndpointInfo>>;

    /// Establishes a session using a previously assembled option vector.
    async fn connect(
        &self,
        endpoint_url: &str,
        options: &[ClientOption],
    ) -> OpcUaResult<Arc<dyn UaSession>>;
}
