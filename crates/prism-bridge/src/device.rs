// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Device records and guarded state transitions.
//!
//! One [`DeviceRecord`] exists per upstream OPC UA device, created from the
//! PLC list at startup and alive for the process lifetime. Records advance
//! one state at a time:
//!
//! ```text
//! Configured -> ReadTags -> ReadyOptions -> Connected -> Subscribed
//!                                ^                            |
//!                                +--- subscription loss -------+
//! ```
//!
//! A failed transition records the error and leaves the status unchanged;
//! the reconciliation loop retries on its next tick. Falling back from
//! `Subscribed` lands on `ReadyOptions`, not `Configured`, so the tag
//! catalog survives subscription loss.
//!
//! The session and subscription handles are `Option`-typed and owned by the
//! record; the subscription handle is non-null exactly while the status is
//! `Subscribed`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use prism_core::error::{DeviceError, DeviceResult};
use prism_core::types::{DeviceStatus, UnitId};
use prism_opcua::options::{assemble_options, ClientOption};
use prism_opcua::session::{SubscriptionHandle, UaConnector, UaSession};
use prism_opcua::types::{NodeId, UaConfig};

use crate::catalog::{load_tag_file, Tag};
use crate::plc::PlcEntry;

/// A device record shared between the reconciliation loop and its
/// subscription task.
pub type SharedDevice = Arc<RwLock<DeviceRecord>>;

// =============================================================================
// DeviceRecord
// =============================================================================

/// Per-device state: configuration, lifecycle status, tag catalog, and the
/// handles of the active session and subscription.
pub struct DeviceRecord {
    /// Device name, used in logs.
    pub name: String,

    /// Upstream connection configuration.
    pub config: UaConfig,

    /// The Modbus unit this device is mirrored into.
    pub unit_id: UnitId,

    /// Path of the device's tag file.
    pub tag_file: PathBuf,

    /// Current lifecycle status.
    pub status: DeviceStatus,

    /// Last recorded error, cleared when a subscription goes live.
    pub error: Option<String>,

    /// Node-ids to subscribe, in tag-file order.
    pub nodes: Vec<NodeId>,

    /// Tag catalog keyed by node-id string.
    pub tags: HashMap<String, Tag>,

    /// Assembled client options, valid from `ReadyOptions` on.
    pub options: Vec<ClientOption>,

    /// Active session, valid from `Connected` on.
    pub session: Option<Arc<dyn UaSession>>,

    /// Active subscription; non-null exactly while `Subscribed`.
    pub subscription: Option<SubscriptionHandle>,
}

impl DeviceRecord {
    /// Creates a record in `Configured` from a PLC list entry.
    pub fn from_entry(entry: PlcEntry) -> Self {
        Self {
            name: entry.name,
            config: entry.config,
            unit_id: entry.unit_id,
            tag_file: entry.tag_file,
            status: DeviceStatus::Configured,
            error: None,
            nodes: Vec::new(),
            tags: HashMap::new(),
            options: Vec::new(),
            session: None,
            subscription: None,
        }
    }

    /// Wraps a record for sharing.
    pub fn into_shared(self) -> SharedDevice {
        Arc::new(RwLock::new(self))
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// `Configured -> ReadTags`: loads the tag catalog.
    ///
    /// On failure the record is left untouched apart from the error field.
    pub fn load_tags(&mut self) -> DeviceResult<()> {
        let catalog = load_tag_file(&self.tag_file)?;
        self.nodes.extend(catalog.nodes);
        self.tags = catalog.tags;
        self.status = DeviceStatus::ReadTags;
        info!(device = %self.name, tags = self.tags.len(), "tag catalog installed");
        Ok(())
    }

    /// `ReadTags -> ReadyOptions`: endpoint discovery and option assembly.
    pub async fn prepare_options(&mut self, connector: &dyn UaConnector) -> DeviceResult<()> {
        let endpoints = connector
            .discover(&self.config.endpoint)
            .await
            .map_err(|e| DeviceError::discovery(&self.config.endpoint, e.to_string()))?;

        self.options = assemble_options(&self.config, &endpoints)?;
        self.status = DeviceStatus::ReadyOptions;
        debug!(device = %self.name, options = self.options.len(), "client options assembled");
        Ok(())
    }

    /// `ReadyOptions -> Connected`: session connect plus the server-time
    /// liveness probe.
    pub async fn connect(&mut self, connector: &dyn UaConnector) -> DeviceResult<()> {
        let session = connector
            .connect(&self.config.endpoint, &self.options)
            .await
            .map_err(|e| DeviceError::connect(&self.config.endpoint, e.to_string()))?;

        // One read of the server's current time confirms the session is
        // actually serving, not merely accepted.
        match session.read_value(&NodeId::server_time()).await {
            Ok(server_time) => {
                debug!(device = %self.name, server_time = %server_time, "connect probe ok");
            }
            Err(e) => {
                session.disconnect().await;
                return Err(DeviceError::probe(e.to_string()));
            }
        }

        self.session = Some(session);
        self.status = DeviceStatus::Connected;
        info!(device = %self.name, endpoint = %self.config.endpoint, "device connected");
        Ok(())
    }

    /// `Connected -> Subscribed`: called by the subscription task once the
    /// subscription is live.
    pub fn set_subscribed(&mut self, handle: SubscriptionHandle) {
        self.subscription = Some(handle);
        self.status = DeviceStatus::Subscribed;
        self.error = None;
    }

    /// `Subscribed -> ReadyOptions`: subscription lost or shut down.
    ///
    /// The tag catalog and assembled options survive; the session and
    /// subscription handles are cleared so the next tick reconnects.
    pub fn drop_subscription(&mut self) {
        self.subscription = None;
        self.session = None;
        self.status = DeviceStatus::ReadyOptions;
    }

    /// Records a failed transition without advancing the status.
    pub fn record_failure(&mut self, error: &DeviceError) {
        self.error = Some(error.to_string());
    }
}

impl std::fmt::Debug for DeviceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRecord")
            .field("name", &self.name)
            .field("unit_id", &self.unit_id)
            .field("status", &self.status)
            .field("error", &self.error)
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry_with_tag_file(path: PathBuf) -> PlcEntry {
        PlcEntry {
            name: "boiler".to_string(),
            config: UaConfig::from_raw("opc.tcp://plc:4840", "", "", "", "", "").unwrap(),
            unit_id: UnitId::new(1).unwrap(),
            tag_file: path,
        }
    }

    #[test]
    fn test_new_record_is_configured() {
        let device = DeviceRecord::from_entry(entry_with_tag_file(PathBuf::from("tags.tsv")));
        assert_eq!(device.status, DeviceStatus::Configured);
        assert!(device.session.is_none());
        assert!(device.subscription.is_none());
        assert!(device.error.is_none());
    }

    #[test]
    fn test_load_tags_advances_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"1\tx\tns=3;i=1\tbool\tcoil\t10\n").unwrap();

        let mut device =
            DeviceRecord::from_entry(entry_with_tag_file(file.path().to_path_buf()));
        device.load_tags().unwrap();

        assert_eq!(device.status, DeviceStatus::ReadTags);
        assert_eq!(device.nodes.len(), 1);
        assert!(device.tags.contains_key("ns=3;i=1"));
    }

    #[test]
    fn test_load_tags_failure_keeps_status() {
        let mut device =
            DeviceRecord::from_entry(entry_with_tag_file(PathBuf::from("/nonexistent.tsv")));
        let error = device.load_tags().unwrap_err();
        device.record_failure(&error);

        assert_eq!(device.status, DeviceStatus::Configured);
        assert!(device.nodes.is_empty());
        assert!(device.error.is_some());
    }

    #[test]
    fn test_subscription_handle_invariant() {
        let mut device = DeviceRecord::from_entry(entry_with_tag_file(PathBuf::from("t.tsv")));
        device.status = DeviceStatus::Connected;

        device.set_subscribed(SubscriptionHandle::new(7));
        assert_eq!(device.status, DeviceStatus::Subscribed);
        assert!(device.subscription.is_some());
        assert!(device.error.is_none());

        device.drop_subscription();
        assert_eq!(device.status, DeviceStatus::ReadyOptions);
        assert!(device.subscription.is_none());
        assert!(device.session.is_none());
    }
}
