// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-device tag catalogs.
//!
//! A tag file is tab-separated with `#` comment lines. Each data row has
//! exactly six fields; the ones the bridge uses are:
//!
//! | index | content |
//! |---|---|
//! | 2 | OPC UA node-id string |
//! | 3 | data-type tag (informational) |
//! | 4 | Modbus function/table name |
//! | 5 | Modbus base address, decimal |
//!
//! Rows with a different field count or a non-integer address are skipped.
//! A file that yields no usable rows is an error and leaves the device
//! record untouched.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use prism_core::error::{DeviceError, DeviceResult};
use prism_modbus::frame::RegisterKind;
use prism_opcua::types::NodeId;

/// Number of fields in a data row.
const TAG_ROW_FIELDS: usize = 6;

// =============================================================================
// Tag
// =============================================================================

/// The Modbus destination of one OPC UA node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Declared source data type. Informational only: the projector trusts
    /// the runtime type of each data change, not this label.
    pub data_type: String,

    /// Destination table. `None` when the function field did not name one
    /// of the four tables; such tags are carried but never projected.
    pub kind: Option<RegisterKind>,

    /// Base register/bit address. Multi-register values occupy consecutive
    /// addresses starting here.
    pub address: u16,
}

// =============================================================================
// TagCatalog
// =============================================================================

/// The parsed contents of one tag file.
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    /// Node-ids in file order; the first becomes the subscription seed.
    pub nodes: Vec<NodeId>,

    /// Tags keyed by node-id string.
    pub tags: HashMap<String, Tag>,
}

impl TagCatalog {
    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` when the catalog holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Looks up the tag for a node-id string.
    pub fn get(&self, node: &str) -> Option<&Tag> {
        self.tags.get(node)
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Parses a tag file.
///
/// # Errors
///
/// - [`DeviceError::TagFile`] when the file cannot be read
/// - [`DeviceError::EmptyData`] when no row survives parsing
pub fn load_tag_file(path: &Path) -> DeviceResult<TagCatalog> {
    let content =
        fs::read_to_string(path).map_err(|e| DeviceError::tag_file(path, e.to_string()))?;

    let mut catalog = TagCatalog::default();

    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != TAG_ROW_FIELDS {
            debug!(
                path = %path.display(),
                line = line_number + 1,
                fields = fields.len(),
                "tag row skipped: wrong field count"
            );
            continue;
        }

        let address: u16 = match fields[5].trim().parse() {
            Ok(address) => address,
            Err(_) => {
                warn!(
                    path = %path.display(),
                    line = line_number + 1,
                    address = fields[5],
                    "tag row skipped: non-integer address"
                );
                continue;
            }
        };

        let node = fields[2].to_string();
        catalog.nodes.push(NodeId::new(node.clone()));
        catalog.tags.insert(
            node,
            Tag {
                data_type: fields[3].to_string(),
                kind: RegisterKind::parse(fields[4]),
                address,
            },
        );
    }

    if catalog.nodes.is_empty() || catalog.tags.is_empty() {
        return Err(DeviceError::empty_data(path));
    }

    debug!(path = %path.display(), tags = catalog.len(), "tag catalog loaded");
    Ok(catalog)
}

// =============================================================================
// Tests
// =============================================================================
