// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! On-disk test fixtures.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use prism_bridge::plc::PLC_LIST_FILE;

/// A device directory holding a PLC list and tag files.
pub struct DeviceDirFixture {
    dir: TempDir,
}

impl DeviceDirFixture {
    /// Creates an empty device directory.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    /// Returns the directory path.
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Writes the PLC list.
    pub fn write_plc_list(&self, content: &str) -> &Self {
        fs::write(self.dir.path().join(PLC_LIST_FILE), content).expect("write plc list");
        self
    }

    /// Writes a tag file.
    pub fn write_tag_file(&self, name: &str, content: &str) -> &Self {
        fs::write(self.dir.path().join(name), content).expect("write tag file");
        self
    }

    /// One device row for the PLC list, unsecured and anonymous.
    pub fn plc_row(host: &str, unit_id: u8, tag_file: &str) -> String {
        format!("1\tsite\t{host}\t4840\t\t\t\t\t\t{unit_id}\t{tag_file}\n")
    }

    /// One tag row for a tag file.
    pub fn tag_row(node: &str, data_type: &str, function: &str, address: u16) -> String {
        format!("1\tname\t{node}\t{data_type}\t{function}\t{address}\n")
    }
}

impl Default for DeviceDirFixture {
    fn default() -> Self {
        Self::new()
    }
}
