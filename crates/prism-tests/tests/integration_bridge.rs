// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Bridge Integration Tests
//!
//! The full ingest pipeline over a scripted OPC UA session: PLC list and
//! tag files on disk, device records walked to `Subscribed` by the
//! reconciliation loop, data changes projected into the bank, and the
//! result read back over a live Modbus TCP connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use prism_bridge::device::{DeviceRecord, SharedDevice};
use prism_bridge::plc::load_plc_list;
use prism_bridge::reconcile::Reconciler;
use prism_core::types::{DeviceStatus, UnitId, Value};
use prism_modbus::bank::RegisterBank;
use prism_modbus::server::ModbusServer;

use prism_tests::common::fixtures::DeviceDirFixture;
use prism_tests::common::mocks::FakeConnector;

// =============================================================================
// Harness
// =============================================================================

struct BridgeHarness {
    bank: Arc<RegisterBank>,
    devices: Vec<SharedDevice>,
    connector: Arc<FakeConnector>,
    shutdown: broadcast::Sender<()>,
}

impl BridgeHarness {
    /// Loads the device directory and starts a fast reconciliation loop.
    fn start(fixture: &DeviceDirFixture) -> Self {
        let entries = load_plc_list(&fixture.path()).expect("plc list");

        let bank = Arc::new(RegisterBank::new());
        let devices: Vec<SharedDevice> = entries
            .into_iter()
            .map(|entry| {
                bank.add_unit(entry.unit_id);
                DeviceRecord::from_entry(entry).into_shared()
            })
            .collect();

        let connector = Arc::new(FakeConnector::unsecured());
        let (shutdown, _) = broadcast::channel(4);

        let reconciler = Reconciler::new(devices.clone(), bank.clone(), connector.clone())
            .with_interval(Duration::from_millis(20));
        tokio::spawn(reconciler.run(shutdown.clone()));

        Self {
            bank,
            devices,
            connector,
            shutdown,
        }
    }

    /// Waits until a device reaches the wanted status.
    async fn wait_for_status(&self, index: usize, wanted: DeviceStatus) {
        for _ in 0..100 {
            if self.devices[index].read().await.status == wanted {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let status = self.devices[index].read().await.status;
        panic!("device {index} stuck in {status}, wanted {wanted}");
    }
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[tokio::test]
async fn test_device_walks_to_subscribed_and_mirrors_values() {
    let fixture = DeviceDirFixture::new();
    fixture.write_plc_list(&DeviceDirFixture::plc_row("10.0.0.5", 1, "boiler.tsv"));
    fixture.write_tag_file(
        "boiler.tsv",
        &(DeviceDirFixture::tag_row("ns=3;i=1001", "float", "holding", 200)
            + &DeviceDirFixture::tag_row("ns=3;i=1002", "bool", "coil", 100)
            + &DeviceDirFixture::tag_row("ns=3;i=1003", "int", "input", 50)),
    );

    let harness = BridgeHarness::start(&fixture);
    harness.wait_for_status(0, DeviceStatus::Subscribed).await;

    // All three nodes are monitored, seed first.
    let monitored = harness.connector.session.monitored();
    assert_eq!(monitored.len(), 3);
    assert_eq!(monitored[0].as_str(), "ns=3;i=1001");

    // Push changes through the scripted session.
    let session = &harness.connector.session;
    session.push_change("ns=3;i=1001", Value::Float32(1.0));
    session.push_change("ns=3;i=1002", Value::Bool(true));
    session.push_change("ns=3;i=1003", Value::UInt32(0x0001_0002));

    let unit = UnitId::new(1).unwrap();
    assert_eq!(
        harness.bank.read_holding(unit, 200, 2).unwrap(),
        vec![0x04, 0x3F, 0x80, 0x00, 0x00]
    );
    assert_eq!(
        harness.bank.read_coils(unit, 100, 1).unwrap(),
        vec![0x01, 0x01]
    );
    assert_eq!(
        harness.bank.read_input(unit, 50, 2).unwrap(),
        vec![0x04, 0x00, 0x01, 0x00, 0x02]
    );

    // A change for an unknown node or with bad status is dropped.
    session.push_change("ns=3;i=9999", Value::UInt16(1));
    session.push_bad_change("ns=3;i=1002", Value::Bool(false));
    assert_eq!(
        harness.bank.read_coils(unit, 100, 1).unwrap(),
        vec![0x01, 0x01]
    );
}

#[tokio::test]
async fn test_shutdown_unsubscribes_and_falls_back() {
    let fixture = DeviceDirFixture::new();
    fixture.write_plc_list(&DeviceDirFixture::plc_row("10.0.0.5", 1, "dev.tsv"));
    fixture.write_tag_file("dev.tsv", &DeviceDirFixture::tag_row("ns=1;i=1", "bool", "coil", 1));

    let harness = BridgeHarness::start(&fixture);
    harness.wait_for_status(0, DeviceStatus::Subscribed).await;

    harness.shutdown.send(()).unwrap();
    harness.wait_for_status(0, DeviceStatus::ReadyOptions).await;

    let record = harness.devices[0].read().await;
    assert!(record.subscription.is_none());
    assert!(record.session.is_none());
    assert_eq!(
        harness
            .connector
            .session
            .unsubscribed
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    // The tag catalog survives the fallback.
    assert_eq!(record.nodes.len(), 1);
}

#[tokio::test]
async fn test_per_node_failure_logged_but_subscription_survives() {
    let fixture = DeviceDirFixture::new();
    fixture.write_plc_list(&DeviceDirFixture::plc_row("10.0.0.5", 1, "dev.tsv"));
    fixture.write_tag_file(
        "dev.tsv",
        &(DeviceDirFixture::tag_row("ns=1;i=1", "bool", "coil", 1)
            + &DeviceDirFixture::tag_row("ns=1;i=2", "bool", "coil", 2)
            + &DeviceDirFixture::tag_row("ns=1;i=3", "bool", "coil", 3)),
    );

    let harness = BridgeHarness::start(&fixture);
    harness
        .connector
        .session
        .failing_nodes
        .lock()
        .unwrap()
        .push("ns=1;i=2".to_string());

    harness.wait_for_status(0, DeviceStatus::Subscribed).await;

    // The failing node is absent, the others are monitored.
    let monitored = harness.connector.session.monitored();
    assert_eq!(monitored.len(), 2);
    assert!(monitored.iter().all(|n| n.as_str() != "ns=1;i=2"));
}

#[tokio::test]
async fn test_subscription_error_recorded_without_state_change() {
    let fixture = DeviceDirFixture::new();
    fixture.write_plc_list(&DeviceDirFixture::plc_row("10.0.0.5", 1, "dev.tsv"));
    fixture.write_tag_file("dev.tsv", &DeviceDirFixture::tag_row("ns=1;i=1", "bool", "coil", 1));

    let harness = BridgeHarness::start(&fixture);
    harness.wait_for_status(0, DeviceStatus::Subscribed).await;

    harness.connector.session.push_error("sub=1 BadTimeout");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let record = harness.devices[0].read().await;
    assert_eq!(record.status, DeviceStatus::Subscribed);
    assert_eq!(record.error.as_deref(), Some("sub=1 BadTimeout"));
}

#[tokio::test]
async fn test_two_devices_two_units() {
    let fixture = DeviceDirFixture::new();
    fixture.write_plc_list(
        &(DeviceDirFixture::plc_row("10.0.0.5", 1, "a.tsv")
            + &DeviceDirFixture::plc_row("10.0.0.6", 2, "b.tsv")),
    );
    fixture.write_tag_file("a.tsv", &DeviceDirFixture::tag_row("ns=1;i=1", "int", "holding", 10));
    fixture.write_tag_file("b.tsv", &DeviceDirFixture::tag_row("ns=1;i=1", "int", "holding", 10));

    let harness = BridgeHarness::start(&fixture);
    harness.wait_for_status(0, DeviceStatus::Subscribed).await;
    harness.wait_for_status(1, DeviceStatus::Subscribed).await;

    // Both devices share one scripted session, so the change lands on both
    // units; each unit's tables stay independent.
    harness.connector.session.push_change("ns=1;i=1", Value::UInt16(7));

    for id in [1u8, 2] {
        let unit = UnitId::new(id).unwrap();
        assert_eq!(
            harness.bank.read_holding(unit, 10, 1).unwrap(),
            vec![0x02, 0x00, 0x07]
        );
    }
}

// =============================================================================
// End-to-End: Ingest to Wire
// =============================================================================

#[tokio::test]
async fn test_ingest_to_wire_round_trip() {
    let fixture = DeviceDirFixture::new();
    fixture.write_plc_list(&DeviceDirFixture::plc_row("10.0.0.5", 1, "dev.tsv"));
    fixture.write_tag_file(
        "dev.tsv",
        &DeviceDirFixture::tag_row("ns=3;i=1001", "float", "holding", 200),
    );

    let harness = BridgeHarness::start(&fixture);
    harness.wait_for_status(0, DeviceStatus::Subscribed).await;

    let server = ModbusServer::new(harness.bank.clone(), "127.0.0.1", 0);
    let listener = server.bind().await.expect("bind");
    let address = listener.local_addr().expect("local addr");
    tokio::spawn(server.run(listener, harness.shutdown.subscribe()));

    harness
        .connector
        .session
        .push_change("ns=3;i=1001", Value::Float32(1.0));

    let mut stream = TcpStream::connect(address).await.expect("connect");
    stream
        .write_all(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0xC8, 0x00, 0x02])
        .await
        .expect("write");

    let mut response = vec![0u8; 32];
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut response))
        .await
        .expect("response timeout")
        .expect("read");
    response.truncate(n);

    assert_eq!(
        response,
        vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, 0x3F, 0x80, 0x00, 0x00]
    );
}
