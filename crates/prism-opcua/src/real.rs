// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Production connector backed by the `opcua` crate.
//!
//! This module implements the [`UaConnector`]/[`UaSession`] seam against a
//! real OPC UA stack. The `opcua` client is synchronous; its calls complete
//! quickly against a healthy server and the bridge only issues them from
//! the reconciliation path, never from the Modbus serving path.
//!
//! Data-change notifications are delivered by the library's own publish
//! thread; the registered [`DataChangeHandler`] is invoked directly from
//! that thread.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use opcua::client::prelude::*;
use opcua::sync::RwLock as OpcUaRwLock;

use prism_core::types::Value;

use crate::error::{OpcUaError, OpcUaResult};
use crate::options::{ClientOption, EndpointInfo};
use crate::session::{DataChange, DataChangeHandler, SubscriptionHandle, UaSession};
use crate::types::{NodeId, SecurityMode};

/// Subscription lifetime, in publish intervals.
const SUBSCRIPTION_LIFETIME_COUNT: u32 = 600;

/// Keep-alive count, in publish intervals.
const SUBSCRIPTION_KEEPALIVE_COUNT: u32 = 30;

/// Monitored item queue depth on the server side.
const MONITORED_ITEM_QUEUE_SIZE: u32 = 10;

// =============================================================================
// OpcUaConnector
// =============================================================================

/// Connector creating real sessions via the `opcua` crate.
#[derive(Debug, Default)]
pub struct OpcUaConnector {
    application_name: String,
    application_uri: String,
}

impl OpcUaConnector {
    /// Creates a connector with the bridge's application identity.
    pub fn new() -> Self {
        Self {
            application_name: "PRISM Bridge".to_string(),
            application_uri: "urn:prism:bridge".to_string(),
        }
    }

    /// Builds a client configured from an assembled option vector.
    fn build_client(&self, options: &[ClientOption]) -> OpcUaResult<Client> {
        let mut builder = ClientBuilder::new()
            .application_name(&self.application_name)
            .application_uri(&self.application_uri)
            .trust_server_certs(true)
            .create_sample_keypair(false);

        for option in options {
            match option {
                ClientOption::AutoReconnect(enabled) => {
                    // Negative means retry forever.
                    builder = builder.session_retry_limit(if *enabled { -1 } else { 0 });
                }
                ClientOption::CertificateFile(path) => {
                    builder = builder.certificate_path(path.clone());
                }
                ClientOption::PrivateKeyFile(path) => {
                    builder = builder.private_key_path(path.clone());
                }
                // Policy, mode and token are applied through the endpoint
                // binding below; nothing to set on the builder.
                _ => {}
            }
        }

        builder
            .client()
            .ok_or_else(|| OpcUaError::connect("failed to build OPC UA client"))
    }
}

/// Extracts the endpoint binding and identity token from the option vector.
fn connection_target(options: &[ClientOption]) -> OpcUaResult<(String, MessageSecurityMode, IdentityToken)> {
    let mut identity = IdentityToken::Anonymous;
    let mut binding = None;

    for option in options {
        match option {
            ClientOption::AuthUserName { username, password } => {
                identity = IdentityToken::UserName(username.clone(), password.clone());
            }
            ClientOption::AuthCertificate => {
                identity = IdentityToken::X509(
                    std::path::PathBuf::from(crate::options::CERTIFICATE_FILE),
                    std::path::PathBuf::from(crate::options::PRIVATE_KEY_FILE),
                );
            }
            ClientOption::AuthAnonymous => {
                identity = IdentityToken::Anonymous;
            }
            ClientOption::SecurityFromEndpoint { policy_uri, mode, .. } => {
                binding = Some((policy_uri.clone(), to_message_security_mode(*mode)));
            }
            _ => {}
        }
    }

    let (policy_uri, mode) =
        binding.ok_or_else(|| OpcUaError::connect("option vector carries no endpoint binding"))?;
    Ok((policy_uri, mode, identity))
}

fn to_message_security_mode(mode: SecurityMode) -> MessageSecurityMode {
    match mode {
        SecurityMode::None => MessageSecurityMode::None,
        SecurityMode::Sign => MessageSecurityMode::Sign,
        SecurityMode::SignAndEncrypt => MessageSecurityMode::SignAndEncrypt,
    }
}

fn from_message_security_mode(mode: MessageSecurityMode) -> SecurityMode {
    match mode {
        MessageSecurityMode::Sign => SecurityMode::Sign,
        MessageSecurityMode::SignAndEncrypt => SecurityMode::SignAndEncrypt,
        _ => SecurityMode::None,
    }
}

fn token_type_name(token_type: UserTokenType) -> &'static str {
    match token_type {
        UserTokenType::Anonymous => "Anonymous",
        UserTokenType::UserName => "UserName",
        UserTokenType::Certificate => "Certificate",
        UserTokenType::IssuedToken => "IssuedToken",
    }
}

#[async_trait]
impl crate::session::UaConnector for OpcUaConnector {
    async fn discover(&self, endpoint_url: &str) -> OpcUaResult<Vec<EndpointInfo>> {
        let client = self.build_client(&[ClientOption::AutoReconnect(false)])?;

        let endpoints = client
            .get_server_endpoints_from_url(endpoint_url)
            .map_err(|e| OpcUaError::discovery(format!("{}: {}", endpoint_url, e)))?;

        let infos = endpoints
            .iter()
            .map(|e| EndpointInfo {
                policy_uri: e.security_policy_uri.as_ref().to_string(),
                mode: from_message_security_mode(e.security_mode),
                token_types: e
                    .user_identity_tokens
                    .as_ref()
                    .map(|tokens| {
                        tokens
                            .iter()
                            .map(|t| token_type_name(t.token_type).to_string())
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        debug!(endpoint = endpoint_url, "endpoint discovery complete");
        Ok(infos)
    }

    async fn connect(
        &self,
        endpoint_url: &str,
        options: &[ClientOption],
    ) -> OpcUaResult<Arc<dyn UaSession>> {
        let mut client = self.build_client(options)?;
        let (policy_uri, security_mode, identity) = connection_target(options)?;

        let endpoints = client
            .get_server_endpoints_from_url(endpoint_url)
            .map_err(|e| OpcUaError::discovery(format!("{}: {}", endpoint_url, e)))?;

        let endpoint = endpoints
            .iter()
            .find(|e| {
                e.security_policy_uri.as_ref() == policy_uri && e.security_mode == security_mode
            })
            .cloned()
            .ok_or_else(|| {
                OpcUaError::connect(format!(
                    "endpoint binding {}/{:?} disappeared between discovery and connect",
                    policy_uri, security_mode
                ))
            })?;

        let session = client
            .connect_to_endpoint(endpoint, identity)
            .map_err(|e| OpcUaError::connect(format!("{}: {}", endpoint_url, e)))?;

        // The publish loop must run for subscriptions to deliver.
        let stop_handle = Session::run_async(session.clone());

        info!(endpoint = endpoint_url, "OPC UA session established");
        Ok(Arc::new(RealUaSession {
            session,
            stop_handle: Mutex::new(Some(stop_handle)),
            subscriptions: Mutex::new(HashMap::new()),
        }))
    }
}

// =============================================================================
// RealUaSession
// =============================================================================

// `Session::run_async` hands back the command sender for its loop.
type SessionStopHandle = tokio::sync::oneshot::Sender<SessionCommand>;

/// A live session plus its publish-loop stop handle.
pub struct RealUaSession {
    session: Arc<OpcUaRwLock<Session>>,
    stop_handle: Mutex<Option<SessionStopHandle>>,
    subscriptions: Mutex<HashMap<u32, Duration>>,
}

impl RealUaSession {
    fn to_opcua_node_id(node: &NodeId) -> OpcUaResult<opcua::types::NodeId> {
        opcua::types::NodeId::from_str(node.as_str())
            .map_err(|_| OpcUaError::invalid_node_id(node.as_str()))
    }

    fn monitored_item_request(
        node: &NodeId,
        sampling_interval: Duration,
    ) -> OpcUaResult<MonitoredItemCreateRequest> {
        Ok(MonitoredItemCreateRequest {
            item_to_monitor: ReadValueId {
                node_id: Self::to_opcua_node_id(node)?,
                attribute_id: AttributeId::Value as u32,
                index_range: opcua::types::UAString::null(),
                data_encoding: opcua::types::QualifiedName::null(),
            },
            monitoring_mode: MonitoringMode::Reporting,
            requested_parameters: MonitoringParameters {
                sampling_interval: sampling_interval.as_millis() as f64,
                filter: ExtensionObject::null(),
                queue_size: MONITORED_ITEM_QUEUE_SIZE,
                discard_oldest: true,
                client_handle: 0,
            },
        })
    }
}

/// Converts an `opcua` variant into the bridge's value union.
///
/// The width table of the projector is preserved exactly; any tag outside
/// it maps to `Value::Null`, which the projector drops.
fn variant_to_value(variant: &Variant) -> Value {
    match variant {
        Variant::Boolean(v) => Value::Bool(*v),
        Variant::SByte(v) => Value::Int8(*v),
        Variant::Byte(v) => Value::UInt8(*v),
        Variant::Int16(v) => Value::Int16(*v),
        Variant::UInt16(v) => Value::UInt16(*v),
        Variant::Int32(v) => Value::Int32(*v),
        Variant::UInt32(v) => Value::UInt32(*v),
        Variant::Int64(v) => Value::Int64(*v),
        Variant::UInt64(v) => Value::UInt64(*v),
        Variant::Float(v) => Value::Float32(*v),
        Variant::Double(v) => Value::Float64(*v),
        Variant::String(v) => Value::String(v.as_ref().to_string()),
        Variant::DateTime(v) => Value::DateTime(
            chrono::DateTime::from_timestamp(
                v.as_chrono().timestamp(),
                v.as_chrono().timestamp_subsec_nanos(),
            )
            .unwrap_or_else(chrono::Utc::now),
        ),
        _ => Value::Null,
    }
}

fn opcua_timestamp(timestamp: &Option<opcua::types::DateTime>) -> Option<chrono::DateTime<chrono::Utc>> {
    timestamp.as_ref().and_then(|t| {
        chrono::DateTime::from_timestamp(
            t.as_chrono().timestamp(),
            t.as_chrono().timestamp_subsec_nanos(),
        )
    })
}

#[async_trait]
impl UaSession for RealUaSession {
    async fn read_value(&self, node: &NodeId) -> OpcUaResult<Value> {
        let node_id = Self::to_opcua_node_id(node)?;

        let read_value_id = ReadValueId {
            node_id,
            attribute_id: AttributeId::Value as u32,
            index_range: opcua::types::UAString::null(),
            data_encoding: opcua::types::QualifiedName::null(),
        };

        let session = self.session.read();
        let results = session
            .read(&[read_value_id], TimestampsToReturn::Both, 0.0)
            .map_err(|e| OpcUaError::read(node.as_str(), format!("{}", e)))?;

        let data_value = results
            .first()
            .ok_or_else(|| OpcUaError::read(node.as_str(), "empty read result"))?;

        match &data_value.value {
            Some(variant) => Ok(variant_to_value(variant)),
            None => Err(OpcUaError::read(
                node.as_str(),
                format!(
                    "no value, status {:?}",
                    data_value.status.unwrap_or(StatusCode::BadUnexpectedError)
                ),
            )),
        }
    }

    async fn subscribe(
        &self,
        publishing_interval: Duration,
        seed: &NodeId,
        handler: Arc<dyn DataChangeHandler>,
    ) -> OpcUaResult<SubscriptionHandle> {
        let callback_handler = handler.clone();
        let callback = DataChangeCallback::new(move |changed_items| {
            for item in changed_items {
                let node = NodeId::new(item.item_to_monitor().node_id.to_string());
                let data_value = item.last_value();
                let change = DataChange {
                    node,
                    value: data_value
                        .value
                        .as_ref()
                        .map(variant_to_value)
                        .unwrap_or(Value::Null),
                    status_good: data_value.status.map(|s| s.is_good()).unwrap_or(false),
                    server_timestamp: opcua_timestamp(&data_value.server_timestamp),
                    source_timestamp: opcua_timestamp(&data_value.source_timestamp),
                };
                callback_handler.on_data_change(change);
            }
        });

        let subscription_id = {
            let session = self.session.read();
            session
                .create_subscription(
                    publishing_interval.as_millis() as f64,
                    SUBSCRIPTION_LIFETIME_COUNT,
                    SUBSCRIPTION_KEEPALIVE_COUNT,
                    0,
                    0,
                    true,
                    callback,
                )
                .map_err(|e| OpcUaError::subscription(format!("create failed: {}", e)))?
        };

        // Seed the subscription with its first monitored node.
        let request = Self::monitored_item_request(seed, publishing_interval)?;
        {
            let session = self.session.read();
            session
                .create_monitored_items(subscription_id, TimestampsToReturn::Both, &[request])
                .map_err(|e| {
                    OpcUaError::subscription(format!("seed node {}: {}", seed, e))
                })?;
        }

        self.subscriptions
            .lock()
            .await
            .insert(subscription_id, publishing_interval);

        info!(subscription = subscription_id, seed = %seed, "subscription created");
        Ok(SubscriptionHandle::new(subscription_id))
    }

    async fn add_node(&self, subscription: &SubscriptionHandle, node: &NodeId) -> OpcUaResult<()> {
        let sampling_interval = self
            .subscriptions
            .lock()
            .await
            .get(&subscription.id)
            .copied()
            .ok_or_else(|| {
                OpcUaError::subscription(format!("unknown subscription {}", subscription.id))
            })?;

        let request = Self::monitored_item_request(node, sampling_interval)?;
        let session = self.session.read();
        let results = session
            .create_monitored_items(subscription.id, TimestampsToReturn::Both, &[request])
            .map_err(|e| OpcUaError::subscription(format!("add node {}: {}", node, e)))?;

        if let Some(result) = results.first() {
            if !result.status_code.is_good() {
                return Err(OpcUaError::subscription(format!(
                    "add node {}: {:?}",
                    node, result.status_code
                )));
            }
        }
        Ok(())
    }

    async fn unsubscribe(&self, subscription: SubscriptionHandle) -> OpcUaResult<()> {
        self.subscriptions.lock().await.remove(&subscription.id);

        let session = self.session.read();
        session
            .delete_subscription(subscription.id)
            .map_err(|e| OpcUaError::subscription(format!("delete failed: {}", e)))?;

        debug!(subscription = subscription.id, "subscription deleted");
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(stop) = self.stop_handle.lock().await.take() {
            let _ = stop.send(SessionCommand::Stop);
        }
        let session = self.session.read();
        session.disconnect();
        info!("OPC UA session closed");
    }
}

impl std::fmt::Debug for RealUaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealUaSession").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
