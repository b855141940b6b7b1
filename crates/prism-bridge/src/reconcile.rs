// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The reconciliation loop.
//!
//! A single periodic task scans every device record in order and attempts
//! the one transition its current status enables, never more than one per
//! device per tick. Devices in `Subscribed` are skipped; their subscription
//! task owns them. The first tick fires immediately so a healthy fleet
//! comes up without waiting a full interval.
//!
//! On shutdown the ticker stops and the loop exits; the subscription tasks
//! observe the same signal and unwind on their own.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use prism_core::types::DeviceStatus;
use prism_modbus::bank::RegisterBank;
use prism_opcua::session::UaConnector;

use crate::device::SharedDevice;
use crate::subscribe;

/// Default interval between reconciliation ticks.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(600);

// =============================================================================
// Reconciler
// =============================================================================

/// Drives every device through its state machine.
pub struct Reconciler {
    devices: Vec<SharedDevice>,
    bank: Arc<RegisterBank>,
    connector: Arc<dyn UaConnector>,
    interval: Duration,
}

impl Reconciler {
    /// Creates a reconciler over a fixed device set.
    pub fn new(
        devices: Vec<SharedDevice>,
        bank: Arc<RegisterBank>,
        connector: Arc<dyn UaConnector>,
    ) -> Self {
        Self {
            devices,
            bank,
            connector,
            interval: DEFAULT_RECONCILE_INTERVAL,
        }
    }

    /// Overrides the tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs until the shutdown signal fires.
    ///
    /// The shutdown sender is kept so each spawned subscription task can
    /// subscribe to the same signal.
    pub async fn run(self, shutdown: broadcast::Sender<()>) {
        let mut shutdown_rx = shutdown.subscribe();
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(&shutdown).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("reconciliation loop stopping");
                    return;
                }
            }
        }
    }

    /// One pass over all devices.
    async fn tick(&self, shutdown: &broadcast::Sender<()>) {
        for device in &self.devices {
            let mut record = device.write().await;

            info!(
                device = %record.name,
                status = %record.status,
                error = record.error.as_deref().unwrap_or("-"),
                "device status"
            );

            let result = match record.status {
                DeviceStatus::Configured => record.load_tags(),
                DeviceStatus::ReadTags => record.prepare_options(self.connector.as_ref()).await,
                DeviceStatus::ReadyOptions => record.connect(self.connector.as_ref()).await,
                DeviceStatus::Connected => {
                    // The subscription task performs the final transition.
                    tokio::spawn(subscribe::run_subscription(
                        device.clone(),
                        self.bank.clone(),
                        shutdown.subscribe(),
                    ));
                    Ok(())
                }
                DeviceStatus::Subscribed => Ok(()),
            };

            if let Err(error) = result {
                warn!(device = %record.name, error = %error, "transition failed");
                record.record_failure(&error);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use prism_core::error::DeviceError;
    use prism_core::types::{UnitId, Value};
    use prism_opcua::error::{OpcUaError, OpcUaResult};
    use prism_opcua::options::{ClientOption, EndpointInfo};
    use prism_opcua::session::{
        DataChangeHandler, SubscriptionHandle, UaConnector, UaSession,
    };
    use prism_opcua::types::{NodeId, SecurityMode, SecurityPolicy, UaConfig};

    use crate::device::DeviceRecord;
    use crate::plc::PlcEntry;

    /// Scripted connector: serves one endpoint list, optionally failing
    /// discovery or connect.
    struct ScriptedConnector {
        fail_discovery: bool,
        fail_connect: bool,
        fail_probe: bool,
    }

    struct ScriptedSession {
        fail_probe: bool,
        subscribed: Mutex<u32>,
    }

    #[async_trait]
    impl UaConnector for ScriptedConnector {
        async fn discover(&self, endpoint_url: &str) -> OpcUaResult<Vec<EndpointInfo>> {
            if self.fail_discovery {
                return Err(OpcUaError::discovery(format!("{}: refused", endpoint_url)));
            }
            Ok(vec![EndpointInfo {
                policy_uri: SecurityPolicy::None.uri(),
                mode: SecurityMode::None,
                token_types: vec!["Anonymous".to_string()],
            }])
        }

        async fn connect(
            &self,
            endpoint_url: &str,
            _options: &[ClientOption],
        ) -> OpcUaResult<Arc<dyn UaSession>> {
            if self.fail_connect {
                return Err(OpcUaError::connect(format!("{}: refused", endpoint_url)));
            }
            Ok(Arc::new(ScriptedSession {
                fail_probe: self.fail_probe,
                subscribed: Mutex::new(0),
            }))
        }
    }

    #[async_trait]
    impl UaSession for ScriptedSession {
        async fn read_value(&self, node: &NodeId) -> OpcUaResult<Value> {
            if self.fail_probe {
                return Err(OpcUaError::read(node.as_str(), "BadSessionClosed"));
            }
            Ok(Value::DateTime(chrono::Utc::now()))
        }

        async fn subscribe(
            &self,
            _publishing_interval: Duration,
            _seed: &NodeId,
            _handler: Arc<dyn DataChangeHandler>,
        ) -> OpcUaResult<SubscriptionHandle> {
            let mut subscribed = self.subscribed.lock().unwrap();
            *subscribed += 1;
            Ok(SubscriptionHandle::new(*subscribed))
        }

        async fn add_node(
            &self,
            _subscription: &SubscriptionHandle,
            _node: &NodeId,
        ) -> OpcUaResult<()> {
            Ok(())
        }

        async fn unsubscribe(&self, _subscription: SubscriptionHandle) -> OpcUaResult<()> {
            Ok(())
        }

        async fn disconnect(&self) {}
    }

    fn device_with_tags(content: &str) -> (SharedDevice, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let device = DeviceRecord::from_entry(PlcEntry {
            name: "dev".to_string(),
            config: UaConfig::from_raw("opc.tcp://plc:4840", "", "", "", "", "").unwrap(),
            unit_id: UnitId::new(1).unwrap(),
            tag_file: file.path().to_path_buf(),
        })
        .into_shared();
        (device, file)
    }

    fn reconciler(devices: Vec<SharedDevice>, connector: ScriptedConnector) -> Reconciler {
        let bank = Arc::new(RegisterBank::new());
        bank.add_unit(UnitId::new(1).unwrap());
        Reconciler::new(devices, bank, Arc::new(connector))
            .with_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_one_transition_per_tick() {
        let (device, _file) = device_with_tags("1\tx\tns=3;i=1\tbool\tcoil\t10\n");
        let r = reconciler(
            vec![device.clone()],
            ScriptedConnector {
                fail_discovery: false,
                fail_connect: false,
                fail_probe: false,
            },
        );
        let (shutdown, _) = broadcast::channel(1);

        r.tick(&shutdown).await;
        assert_eq!(device.read().await.status, DeviceStatus::ReadTags);

        r.tick(&shutdown).await;
        assert_eq!(device.read().await.status, DeviceStatus::ReadyOptions);

        r.tick(&shutdown).await;
        assert_eq!(device.read().await.status, DeviceStatus::Connected);
        assert!(device.read().await.session.is_some());
    }

    #[tokio::test]
    async fn test_failed_transition_is_retried() {
        let (device, _file) = device_with_tags("1\tx\tns=3;i=1\tbool\tcoil\t10\n");
        let r = reconciler(
            vec![device.clone()],
            ScriptedConnector {
                fail_discovery: true,
                fail_connect: false,
                fail_probe: false,
            },
        );
        let (shutdown, _) = broadcast::channel(1);

        r.tick(&shutdown).await; // -> ReadTags
        r.tick(&shutdown).await; // discovery fails
        {
            let record = device.read().await;
            assert_eq!(record.status, DeviceStatus::ReadTags);
            assert!(record.error.as_deref().unwrap().contains("refused"));
        }
        // Still stuck, still retrying.
        r.tick(&shutdown).await;
        assert_eq!(device.read().await.status, DeviceStatus::ReadTags);
    }

    #[tokio::test]
    async fn test_probe_failure_stays_ready_options() {
        let (device, _file) = device_with_tags("1\tx\tns=3;i=1\tbool\tcoil\t10\n");
        let r = reconciler(
            vec![device.clone()],
            ScriptedConnector {
                fail_discovery: false,
                fail_connect: false,
                fail_probe: true,
            },
        );
        let (shutdown, _) = broadcast::channel(1);

        r.tick(&shutdown).await;
        r.tick(&shutdown).await;
        r.tick(&shutdown).await; // connect ok, probe fails
        {
            let record = device.read().await;
            assert_eq!(record.status, DeviceStatus::ReadyOptions);
            assert!(record.session.is_none());
            assert!(record.error.is_some());
        }
    }

    #[tokio::test]
    async fn test_subscribed_device_is_skipped() {
        let (device, _file) = device_with_tags("1\tx\tns=3;i=1\tbool\tcoil\t10\n");
        {
            let mut record = device.write().await;
            record.status = DeviceStatus::Subscribed;
            record.subscription = Some(SubscriptionHandle::new(9));
        }
        let r = reconciler(
            vec![device.clone()],
            ScriptedConnector {
                fail_discovery: false,
                fail_connect: false,
                fail_probe: false,
            },
        );
        let (shutdown, _) = broadcast::channel(1);

        r.tick(&shutdown).await;
        let record = device.read().await;
        assert_eq!(record.status, DeviceStatus::Subscribed);
        assert_eq!(record.subscription, Some(SubscriptionHandle::new(9)));
    }

    #[tokio::test]
    async fn test_empty_node_list_records_error() {
        // Reach Connected with a catalog, then clear the nodes to hit the
        // subscription task's guard.
        let (device, _file) = device_with_tags("1\tx\tns=3;i=1\tbool\tcoil\t10\n");
        let r = reconciler(
            vec![device.clone()],
            ScriptedConnector {
                fail_discovery: false,
                fail_connect: false,
                fail_probe: false,
            },
        );
        let (shutdown, _) = broadcast::channel(1);
        r.tick(&shutdown).await;
        r.tick(&shutdown).await;
        r.tick(&shutdown).await;
        device.write().await.nodes.clear();

        r.tick(&shutdown).await; // spawns the subscription task
        tokio::time::sleep(Duration::from_millis(50)).await;

        let record = device.read().await;
        assert_eq!(record.status, DeviceStatus::Connected);
        assert_eq!(
            record.error.as_deref(),
            Some(DeviceError::NoNodes.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_full_walk_to_subscribed_and_shutdown_fallback() {
        let (device, _file) = device_with_tags("1\tx\tns=3;i=1\tbool\tcoil\t10\n");
        let r = reconciler(
            vec![device.clone()],
            ScriptedConnector {
                fail_discovery: false,
                fail_connect: false,
                fail_probe: false,
            },
        );
        let (shutdown, _keep) = broadcast::channel(4);

        for _ in 0..4 {
            r.tick(&shutdown).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        {
            let record = device.read().await;
            assert_eq!(record.status, DeviceStatus::Subscribed);
            assert!(record.subscription.is_some());
        }

        // Cancellation drops the device back to ReadyOptions.
        shutdown.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        {
            let record = device.read().await;
            assert_eq!(record.status, DeviceStatus::ReadyOptions);
            assert!(record.subscription.is_none());
        }
    }
}
