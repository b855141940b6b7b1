// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-device subscription tasks.
//!
//! One task runs per device that reached `Connected`. It creates the
//! subscription seeded with the first node, adds the remaining nodes one by
//! one (logging per-node failures but continuing), marks the device
//! `Subscribed`, and then blocks until shutdown. On shutdown it
//! unsubscribes and drops the device back to `ReadyOptions`.
//!
//! Data changes are handled by [`MirrorHandler`], which runs on the OPC UA
//! library's publish thread: it resolves the node-id against the tag
//! catalog and projects the value into the register bank. Transport errors
//! surfaced by the subscription are forwarded over a channel and recorded
//! on the device without regressing its state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use prism_core::error::DeviceError;
use prism_core::types::UnitId;
use prism_modbus::bank::RegisterBank;
use prism_opcua::session::{DataChange, DataChangeHandler};

use crate::catalog::Tag;
use crate::device::SharedDevice;
use crate::projector;

/// Publishing interval requested for every subscription.
pub const PUBLISHING_INTERVAL: Duration = Duration::from_secs(3);

// =============================================================================
// MirrorHandler
// =============================================================================

/// Writes subscription data changes into the register bank.
pub struct MirrorHandler {
    bank: Arc<RegisterBank>,
    unit: UnitId,
    tags: HashMap<String, Tag>,
    errors: mpsc::UnboundedSender<String>,
}

impl MirrorHandler {
    /// Creates a handler for one device's subscription.
    pub fn new(
        bank: Arc<RegisterBank>,
        unit: UnitId,
        tags: HashMap<String, Tag>,
        errors: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            bank,
            unit,
            tags,
            errors,
        }
    }
}

impl DataChangeHandler for MirrorHandler {
    fn on_data_change(&self, change: DataChange) {
        if !change.status_good {
            debug!(node = %change.node, "change dropped: bad status");
            return;
        }

        let node = change.node.as_str();
        match self.tags.get(node) {
            Some(tag) => {
                projector::project(&self.bank, self.unit, tag, node, &change.value);
            }
            None => {
                debug!(node, "change dropped: no tag");
            }
        }
    }

    fn on_subscription_error(&self, message: String) {
        let _ = self.errors.send(message);
    }
}

// =============================================================================
// Subscription Task
// =============================================================================

/// Runs a device's subscription until shutdown.
pub async fn run_subscription(
    device: SharedDevice,
    bank: Arc<RegisterBank>,
    mut shutdown: broadcast::Receiver<()>,
) {
    // Snapshot what the task needs; the lock is not held across awaits.
    let (name, session, nodes, unit, tags) = {
        let record = device.read().await;
        (
            record.name.clone(),
            record.session.clone(),
            record.nodes.clone(),
            record.unit_id,
            record.tags.clone(),
        )
    };

    let Some(session) = session else {
        error!(device = %name, "subscription task started without a session");
        return;
    };

    if nodes.is_empty() {
        let error = DeviceError::NoNodes;
        error!(device = %name, error = %error, "subscription aborted");
        device.write().await.record_failure(&error);
        return;
    }

    let (error_tx, mut error_rx) = mpsc::unbounded_channel();
    let handler = Arc::new(MirrorHandler::new(bank, unit, tags, error_tx));

    let handle = match session
        .subscribe(PUBLISHING_INTERVAL, &nodes[0], handler)
        .await
    {
        Ok(handle) => handle,
        Err(e) => {
            let error = DeviceError::subscription(e.to_string());
            error!(device = %name, error = %error, "subscription failed");
            device.write().await.record_failure(&error);
            return;
        }
    };

    for node in &nodes[1..] {
        if let Err(e) = session.add_node(&handle, node).await {
            warn!(device = %name, node = %node, error = %e, "node not monitored");
        }
    }

    device.write().await.set_subscribed(handle.clone());
    info!(device = %name, nodes = nodes.len(), "subscribed");

    // Park until cancellation; transient subscription errors are recorded
    // on the device but do not tear the subscription down.
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            message = error_rx.recv() => {
                if let Some(message) = message {
                    warn!(device = %name, error = %message, "subscription error");
                    device.write().await.error = Some(message);
                }
            }
        }
    }

    if let Err(e) = session.unsubscribe(handle).await {
        warn!(device = %name, error = %e, "unsubscribe failed");
    }
    session.disconnect().await;
    device.write().await.drop_subscription();
    info!(device = %name, "unsubscribed");
}
