// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value projection.
//!
//! Each data change carries a dynamically typed value and lands on exactly
//! one tag. Bit-table tags accept booleans only; word-table tags accept the
//! numeric widths below, decomposed big-endian into consecutive registers
//! starting at the tag's base address:
//!
//! | source width | registers |
//! |---|---|
//! | 8-bit int/uint | one, zero-extended |
//! | 16-bit int/uint | one |
//! | 32-bit int/uint | two, high word first |
//! | 64-bit int/uint | four, highest word first |
//! | float32 | IEEE-754 bits, two |
//! | float64 | IEEE-754 bits, four |
//!
//! A value whose runtime type does not fit its tag is dropped and logged at
//! debug; the Modbus side simply keeps the previous value.

use tracing::debug;

use prism_core::types::{UnitId, Value};
use prism_modbus::bank::RegisterBank;
use prism_modbus::frame::RegisterKind;

use crate::catalog::Tag;

// =============================================================================
// Register Decomposition
// =============================================================================

/// Decomposes a numeric value into big-endian 16-bit registers.
///
/// Returns `None` for booleans and every non-numeric tag.
pub fn to_registers(value: &Value) -> Option<Vec<u16>> {
    let registers = match value {
        // 8-bit values occupy one register, zero-extended.
        Value::Int8(v) => vec![*v as u8 as u16],
        Value::UInt8(v) => vec![*v as u16],

        Value::Int16(v) => vec![*v as u16],
        Value::UInt16(v) => vec![*v],

        Value::Int32(v) => split_u32(*v as u32),
        Value::UInt32(v) => split_u32(*v),

        Value::Int64(v) => split_u64(*v as u64),
        Value::UInt64(v) => split_u64(*v),

        Value::Float32(v) => split_u32(v.to_bits()),
        Value::Float64(v) => split_u64(v.to_bits()),

        _ => return None,
    };
    Some(registers)
}

fn split_u32(bits: u32) -> Vec<u16> {
    vec![(bits >> 16) as u16, bits as u16]
}

fn split_u64(bits: u64) -> Vec<u16> {
    vec![
        (bits >> 48) as u16,
        (bits >> 32) as u16,
        (bits >> 16) as u16,
        bits as u16,
    ]
}

// =============================================================================
// Projection
// =============================================================================

/// Writes one data-change value into the bank at its tag's destination.
///
/// Returns the number of addresses written; zero means the value was
/// dropped (type mismatch, unrecognized tag, or unknown unit).
pub fn project(bank: &RegisterBank, unit: UnitId, tag: &Tag, node: &str, value: &Value) -> usize {
    let Some(kind) = tag.kind else {
        debug!(node, "dropped: tag has no destination table");
        return 0;
    };

    if kind.is_bit() {
        let Some(bit) = value.as_bool() else {
            debug!(node, value_type = value.type_name(), table = %kind, "dropped: not a boolean");
            return 0;
        };
        if !bank.write_bit(unit, kind, tag.address, bit) {
            debug!(node, unit = %unit, "dropped: unknown unit");
            return 0;
        }
        return 1;
    }

    let Some(registers) = to_registers(value) else {
        debug!(node, value_type = value.type_name(), table = %kind, "dropped: not projectable");
        return 0;
    };

    let mut written = 0;
    for (offset, register) in registers.iter().enumerate() {
        let Some(address) = tag.address.checked_add(offset as u16) else {
            debug!(node, base = tag.address, "projection truncated at end of address space");
            break;
        };
        if !bank.write_register(unit, kind, address, *register) {
            debug!(node, unit = %unit, "dropped: unknown unit");
            return written;
        }
        written += 1;
    }
    written
}

// =============================================================================
// Tests
// =============================================================================
