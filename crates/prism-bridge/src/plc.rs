// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The PLC list.
//!
//! `plc.tsv` in the device directory names every upstream device, one row
//! per device, tab-separated with `#` comment lines. Columns by index:
//!
//! | index | content |
//! |---|---|
//! | 0, 1 | free |
//! | 2 | host |
//! | 3 | port |
//! | 4 | security policy |
//! | 5 | security mode |
//! | 6 | auth mode |
//! | 7 | username |
//! | 8 | password |
//! | 9 | Modbus unit id (1..=247) |
//! | 10 | tag file name, relative to the device directory |
//!
//! Rows with fewer than 11 fields are skipped. Rows with an invalid unit
//! id or an invalid security combination are skipped with an error log.
//! A list with no usable rows is a fatal configuration error.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use prism_core::error::{ConfigError, ConfigResult};
use prism_core::types::UnitId;
use prism_opcua::types::UaConfig;

/// File name of the PLC list inside the device directory.
pub const PLC_LIST_FILE: &str = "plc.tsv";

/// Number of columns a usable row must have.
const PLC_ROW_FIELDS: usize = 11;

// =============================================================================
// PlcEntry
// =============================================================================

/// One upstream device from the PLC list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlcEntry {
    /// Device name, derived from the tag file stem.
    pub name: String,

    /// Upstream connection configuration.
    pub config: UaConfig,

    /// The Modbus unit this device is mirrored into.
    pub unit_id: UnitId,

    /// Absolute-ish path of the device's tag file.
    pub tag_file: PathBuf,
}

// =============================================================================
// Loader
// =============================================================================

/// Loads `plc.tsv` from the device directory.
///
/// # Errors
///
/// - [`ConfigError::Io`] when the list cannot be read
/// - [`ConfigError::EmptyPlcList`] when no row survives parsing
pub fn load_plc_list(directory: &Path) -> ConfigResult<Vec<PlcEntry>> {
    let path = directory.join(PLC_LIST_FILE);
    let content = fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;

    let mut entries = Vec::new();

    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < PLC_ROW_FIELDS {
            error!(
                path = %path.display(),
                line = line_number + 1,
                fields = fields.len(),
                "plc row skipped: too few fields"
            );
            continue;
        }

        let unit_id = match fields[9].trim().parse::<u8>().ok().and_then(UnitId::new) {
            Some(unit_id) => unit_id,
            None => {
                error!(
                    path = %path.display(),
                    line = line_number + 1,
                    unit_id = fields[9],
                    "plc row skipped: unit id outside 1..=247"
                );
                continue;
            }
        };

        let endpoint = format!("opc.tcp://{}:{}", fields[2].trim(), fields[3].trim());
        let config = match UaConfig::from_raw(
            endpoint,
            fields[4],
            fields[5],
            fields[6],
            fields[7].trim(),
            fields[8].trim(),
        ) {
            Ok(config) => config,
            Err(e) => {
                error!(
                    path = %path.display(),
                    line = line_number + 1,
                    error = %e,
                    "plc row skipped: invalid configuration"
                );
                continue;
            }
        };

        let tag_file = directory.join(fields[10].trim());
        let name = tag_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("unit-{}", unit_id));

        entries.push(PlcEntry {
            name,
            config,
            unit_id,
            tag_file,
        });
    }

    if entries.is_empty() {
        return Err(ConfigError::EmptyPlcList { path });
    }

    info!(path = %path.display(), devices = entries.len(), "plc list loaded");
    Ok(entries)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use prism_opcua::types::{AuthMode, SecurityMode, SecurityPolicy};

    fn write_plc(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PLC_LIST_FILE), content).unwrap();
        dir
    }

    #[test]
    fn test_load_basic_list() {
        let dir = write_plc(
            "# id\tsite\thost\tport\tpolicy\tmode\tauth\tuser\tpass\tunit\ttags\n\
             1\tplant\t10.0.0.5\t4840\t\t\t\t\t\t1\tboiler.tsv\n\
             2\tplant\t10.0.0.6\t4840\tbasic256sha256\tsignandencrypt\tusername\top\tsecret\t17\tchiller.tsv\n",
        );
        let entries = load_plc_list(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].config.endpoint, "opc.tcp://10.0.0.5:4840");
        assert_eq!(entries[0].unit_id.get(), 1);
        assert_eq!(entries[0].name, "boiler");
        assert_eq!(entries[0].config.policy, SecurityPolicy::None);
        assert_eq!(entries[0].config.auth, AuthMode::Anonymous);
        assert!(entries[0].tag_file.ends_with("boiler.tsv"));

        assert_eq!(entries[1].config.policy, SecurityPolicy::Basic256Sha256);
        assert_eq!(entries[1].config.mode, SecurityMode::SignAndEncrypt);
        assert_eq!(entries[1].config.auth, AuthMode::UserName);
        assert_eq!(entries[1].unit_id.get(), 17);
    }

    #[test]
    fn test_short_rows_skipped() {
        let dir = write_plc(
            "1\tplant\t10.0.0.5\t4840\t\t\t\t\t\t1\n\
             1\tplant\t10.0.0.5\t4840\t\t\t\t\t\t3\tok.tsv\n",
        );
        let entries = load_plc_list(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].unit_id.get(), 3);
    }

    #[test]
    fn test_invalid_unit_id_skipped() {
        let dir = write_plc(
            "1\tplant\ta\t4840\t\t\t\t\t\t0\tx.tsv\n\
             1\tplant\tb\t4840\t\t\t\t\t\t248\ty.tsv\n\
             1\tplant\tc\t4840\t\t\t\t\t\tseven\tz.tsv\n\
             1\tplant\td\t4840\t\t\t\t\t\t247\tok.tsv\n",
        );
        let entries = load_plc_list(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].unit_id.get(), 247);
    }

    #[test]
    fn test_invalid_security_combination_skipped() {
        let dir = write_plc(
            "1\tplant\ta\t4840\tbasic256\t\t\t\t\t5\tx.tsv\n\
             1\tplant\tb\t4840\t\t\t\t\t\t6\tok.tsv\n",
        );
        let entries = load_plc_list(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].unit_id.get(), 6);
    }

    #[test]
    fn test_empty_list_is_error() {
        let dir = write_plc("# nothing here\n");
        let error = load_plc_list(dir.path()).unwrap_err();
        assert!(matches!(error, ConfigError::EmptyPlcList { .. }));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_plc_list(dir.path()).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }
}
