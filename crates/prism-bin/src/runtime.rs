// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge runtime orchestration.
//!
//! Startup order matters and is fixed:
//!
//! 1. Parse the PLC list; an empty list is fatal.
//! 2. Create the register bank and add every device's unit.
//! 3. Bind the Modbus listener (a bind failure is fatal) and start
//!    serving.
//! 4. Build the device records and start the reconciliation loop.
//! 5. Wait for the shutdown signal, then let every task unwind.
//!
//! Masters polling before the first subscription is live simply receive
//! `IllegalDataAddress` for addresses that have not been mirrored yet.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use prism_bridge::device::DeviceRecord;
use prism_bridge::plc::load_plc_list;
use prism_bridge::reconcile::Reconciler;
use prism_config::BridgeConfig;
use prism_modbus::bank::RegisterBank;
use prism_modbus::server::ModbusServer;
use prism_opcua::real::OpcUaConnector;

use crate::error::BinResult;
use crate::shutdown::ShutdownCoordinator;

/// Time allowed for subscription tasks to unsubscribe after the shutdown
/// signal.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

// =============================================================================
// BridgeRuntime
// =============================================================================

/// The assembled bridge, ready to run.
pub struct BridgeRuntime {
    config: BridgeConfig,
    shutdown: ShutdownCoordinator,
}

impl BridgeRuntime {
    /// Creates a runtime from a validated configuration.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Runs the bridge until shutdown.
    pub async fn run(self) -> BinResult<()> {
        info!(version = prism_core::VERSION, "starting PRISM bridge");

        // Device list first: an empty fleet is a configuration error, and
        // the register bank needs the unit ids before serving begins.
        let entries = load_plc_list(&self.config.devices.directory)?;

        let bank = Arc::new(RegisterBank::new());
        for entry in &entries {
            bank.add_unit(entry.unit_id);
        }

        let server = ModbusServer::new(
            bank.clone(),
            self.config.modbus.host.clone(),
            self.config.modbus.port,
        );
        let listener = server.bind().await?;
        tokio::spawn(server.run(listener, self.shutdown.subscribe()));

        let devices: Vec<_> = entries
            .into_iter()
            .map(|entry| DeviceRecord::from_entry(entry).into_shared())
            .collect();
        info!(devices = devices.len(), units = bank.unit_count(), "bridge configured");

        let connector = Arc::new(OpcUaConnector::new());
        let reconciler = Reconciler::new(devices, bank, connector)
            .with_interval(self.config.reconcile.interval());
        let reconciler_task = tokio::spawn(reconciler.run(self.shutdown.sender()));

        self.shutdown.wait_for_shutdown().await;

        // Let subscription tasks unsubscribe before the process exits.
        let _ = reconciler_task.await;
        tokio::time::sleep(SHUTDOWN_GRACE).await;

        info!("PRISM bridge shutdown complete");
        Ok(())
    }
}
