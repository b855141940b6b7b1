// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Scripted OPC UA connector and session.
//!
//! [`FakeConnector`] hands out one [`FakeSession`] per connect. The session
//! records subscription activity and lets a test push data changes and
//! subscription errors through the registered handler, exactly as the real
//! transport's publish thread would.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use prism_core::types::Value;
use prism_opcua::error::{OpcUaError, OpcUaResult};
use prism_opcua::options::{ClientOption, EndpointInfo};
use prism_opcua::session::{
    DataChange, DataChangeHandler, SubscriptionHandle, UaConnector, UaSession,
};
use prism_opcua::types::{NodeId, SecurityMode, SecurityPolicy};

// =============================================================================
// FakeSession
// =============================================================================

/// A scripted session.
///
/// Several devices may share one fake session; every registered handler
/// receives every pushed change, mirroring a server that publishes the
/// same node to multiple subscriptions.
#[derive(Default)]
pub struct FakeSession {
    handlers: Mutex<Vec<Arc<dyn DataChangeHandler>>>,
    monitored: Mutex<Vec<NodeId>>,
    next_subscription_id: AtomicU32,
    /// Node names whose `add_node` should fail.
    pub failing_nodes: Mutex<Vec<String>>,
    /// Count of unsubscribe calls.
    pub unsubscribed: AtomicU32,
}

impl FakeSession {
    /// Creates a session with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the monitored node-ids, in add order.
    pub fn monitored(&self) -> Vec<NodeId> {
        self.monitored.lock().unwrap().clone()
    }

    /// Pushes a data change through every registered handler.
    pub fn push_change(&self, node: &str, value: Value) {
        for handler in self.handlers.lock().unwrap().iter() {
            handler.on_data_change(DataChange::new(NodeId::new(node), value.clone()));
        }
    }

    /// Pushes a bad-status data change through every registered handler.
    pub fn push_bad_change(&self, node: &str, value: Value) {
        for handler in self.handlers.lock().unwrap().iter() {
            let mut change = DataChange::new(NodeId::new(node), value.clone());
            change.status_good = false;
            handler.on_data_change(change);
        }
    }

    /// Pushes a subscription error through every registered handler.
    pub fn push_error(&self, message: &str) {
        for handler in self.handlers.lock().unwrap().iter() {
            handler.on_subscription_error(message.to_string());
        }
    }
}

#[async_trait]
impl UaSession for FakeSession {
    async fn read_value(&self, _node: &NodeId) -> OpcUaResult<Value> {
        Ok(Value::DateTime(chrono::Utc::now()))
    }

    async fn subscribe(
        &self,
        _publishing_interval: Duration,
        seed: &NodeId,
        handler: Arc<dyn DataChangeHandler>,
    ) -> OpcUaResult<SubscriptionHandle> {
        self.handlers.lock().unwrap().push(handler);
        self.monitored.lock().unwrap().push(seed.clone());
        let id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SubscriptionHandle::new(id))
    }

    async fn add_node(&self, _subscription: &SubscriptionHandle, node: &NodeId) -> OpcUaResult<()> {
        if self
            .failing_nodes
            .lock()
            .unwrap()
            .iter()
            .any(|n| n == node.as_str())
        {
            return Err(OpcUaError::subscription(format!(
                "{}: BadNodeIdUnknown",
                node
            )));
        }
        self.monitored.lock().unwrap().push(node.clone());
        Ok(())
    }

    async fn unsubscribe(&self, _subscription: SubscriptionHandle) -> OpcUaResult<()> {
        self.unsubscribed.fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().unwrap().clear();
        Ok(())
    }

    async fn disconnect(&self) {}
}

// =============================================================================
// FakeConnector
// =============================================================================

/// A scripted connector serving a fixed endpoint list and session.
pub struct FakeConnector {
    /// Endpoints returned by discovery.
    pub endpoints: Vec<EndpointInfo>,
    /// The session handed out on connect.
    pub session: Arc<FakeSession>,
}

impl FakeConnector {
    /// Creates a connector offering one unsecured anonymous endpoint.
    pub fn unsecured() -> Self {
        Self {
            endpoints: vec![EndpointInfo {
                policy_uri: SecurityPolicy::None.uri(),
                mode: SecurityMode::None,
                token_types: vec!["Anonymous".to_string()],
            }],
            session: Arc::new(FakeSession::new()),
        }
    }
}

#[async_trait]
impl UaConnector for FakeConnector {
    async fn discover(&self, _endpoint_url: &str) -> OpcUaResult<Vec<EndpointInfo>> {
        Ok(self.endpoints.clone())
    }

    async fn connect(
        &self,
        _endpoint_url: &str,
        _options: &[ClientOption],
    ) -> OpcUaResult<Arc<dyn UaSession>> {
        Ok(self.session.clone())
    }
}
