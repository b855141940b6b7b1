// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-unit register banks.
//!
//! A [`RegisterBank`] holds one [`UnitBank`] per Modbus unit identifier.
//! Each unit owns four sparse tables (coils, discrete inputs, holding
//! registers, input registers), each behind its own reader/writer lock, so
//! a subscription callback updating holding registers never contends with a
//! master polling coils.
//!
//! Addresses are sparse: only addresses that have been written exist, and a
//! range read touching an absent address answers `IllegalDataAddress`.
//!
//! A range read holds the table's reader lock for the whole copy, so it
//! observes a consistent snapshot within that table. There is no
//! transactional boundary across tables: a read spanning holding and input
//! registers is two independent snapshots.
//!
//! Locks are held only while copying in-memory maps, never across an await
//! point, which keeps `std::sync::RwLock` safe to use from both the async
//! serving path and the subscription callbacks.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use prism_core::types::UnitId;

use crate::frame::{Exception, RegisterKind};

// =============================================================================
// UnitBank
// =============================================================================

/// The four data tables of a single Modbus unit.
#[derive(Debug, Default)]
struct UnitBank {
    coils: RwLock<HashMap<u16, bool>>,
    discrete_inputs: RwLock<HashMap<u16, bool>>,
    holding_registers: RwLock<HashMap<u16, u16>>,
    input_registers: RwLock<HashMap<u16, u16>>,
}

/// Recovers the guard from a poisoned lock.
///
/// The maps hold plain copyable data, so a writer that panicked mid-update
/// cannot leave a torn value behind.
macro_rules! relock {
    ($guard:expr) => {
        $guard.unwrap_or_else(|poisoned| poisoned.into_inner())
    };
}

// =============================================================================
// RegisterBank
// =============================================================================

/// In-memory register storage for every unit served by the bridge.
///
/// Units are added during the configuration pass before serving begins;
/// [`RegisterBank::add_unit`] and [`RegisterBank::remove_unit`] remain safe
/// afterwards because the unit map sits behind its own lock and handlers
/// only hold short-lived references.
#[derive(Debug, Default)]
pub struct RegisterBank {
    units: RwLock<HashMap<UnitId, Arc<UnitBank>>>,
}

impl RegisterBank {
    /// Creates an empty bank with no units.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Unit Management
    // =========================================================================

    /// Adds a unit with four empty tables. Idempotent.
    pub fn add_unit(&self, id: UnitId) {
        let mut units = relock!(self.units.write());
        if units.contains_key(&id) {
            return;
        }
        units.insert(id, Arc::new(UnitBank::default()));
        tracing::debug!(unit = %id, "register bank: unit added");
    }

    /// Removes a unit and all of its data. Idempotent.
    pub fn remove_unit(&self, id: UnitId) {
        let mut units = relock!(self.units.write());
        if units.remove(&id).is_some() {
            tracing::debug!(unit = %id, "register bank: unit removed");
        }
    }

    /// Returns `true` if the unit exists.
    pub fn contains_unit(&self, id: UnitId) -> bool {
        relock!(self.units.read()).contains_key(&id)
    }

    /// Returns the number of configured units.
    pub fn unit_count(&self) -> usize {
        relock!(self.units.read()).len()
    }

    fn unit(&self, id: UnitId) -> Option<Arc<UnitBank>> {
        relock!(self.units.read()).get(&id).cloned()
    }

    // =========================================================================
    // Writers
    // =========================================================================

    /// Writes a coil. Returns `false` if the unit is unknown.
    pub fn write_coil(&self, id: UnitId, address: u16, value: bool) -> bool {
        match self.unit(id) {
            Some(unit) => {
                relock!(unit.coils.write()).insert(address, value);
                true
            }
            None => false,
        }
    }

    /// Writes a discrete input. Returns `false` if the unit is unknown.
    pub fn write_discrete_input(&self, id: UnitId, address: u16, value: bool) -> bool {
        match self.unit(id) {
            Some(unit) => {
                relock!(unit.discrete_inputs.write()).insert(address, value);
                true
            }
            None => false,
        }
    }

    /// Writes a holding register. Returns `false` if the unit is unknown.
    pub fn write_holding(&self, id: UnitId, address: u16, value: u16) -> bool {
        match self.unit(id) {
            Some(unit) => {
                relock!(unit.holding_registers.write()).insert(address, value);
                true
            }
            None => false,
        }
    }

    /// Writes an input register. Returns `false` if the unit is unknown.
    pub fn write_input(&self, id: UnitId, address: u16, value: u16) -> bool {
        match self.unit(id) {
            Some(unit) => {
                relock!(unit.input_registers.write()).insert(address, value);
                true
            }
            None => false,
        }
    }

    /// Writes into one of the bit tables.
    ///
    /// Returns `false` for an unknown unit or a word-valued `kind`.
    pub fn write_bit(&self, id: UnitId, kind: RegisterKind, address: u16, value: bool) -> bool {
        match kind {
            RegisterKind::Coils => self.write_coil(id, address, value),
            RegisterKind::DiscreteInputs => self.write_discrete_input(id, address, value),
            _ => false,
        }
    }

    /// Writes into one of the word tables.
    ///
    /// Returns `false` for an unknown unit or a bit-valued `kind`.
    pub fn write_register(&self, id: UnitId, kind: RegisterKind, address: u16, value: u16) -> bool {
        match kind {
            RegisterKind::HoldingRegisters => self.write_holding(id, address, value),
            RegisterKind::InputRegisters => self.write_input(id, address, value),
            _ => false,
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// Reads a range of coils, packed as `byte_count, data...`.
    pub fn read_coils(&self, id: UnitId, start: u16, quantity: u16) -> Result<Vec<u8>, Exception> {
        let unit = self.unit(id).ok_or(Exception::IllegalDataAddress)?;
        let table = relock!(unit.coils.read());
        read_bits(&table, start, quantity)
    }

    /// Reads a range of discrete inputs, packed as `byte_count, data...`.
    pub fn read_discrete_inputs(
        &self,
        id: UnitId,
        start: u16,
        quantity: u16,
    ) -> Result<Vec<u8>, Exception> {
        let unit = self.unit(id).ok_or(Exception::IllegalDataAddress)?;
        let table = relock!(unit.discrete_inputs.read());
        read_bits(&table, start, quantity)
    }

    /// Reads a range of holding registers as `byte_count, words...`.
    pub fn read_holding(
        &self,
        id: UnitId,
        start: u16,
        quantity: u16,
    ) -> Result<Vec<u8>, Exception> {
        let unit = self.unit(id).ok_or(Exception::IllegalDataAddress)?;
        let table = relock!(unit.holding_registers.read());
        read_words(&table, start, quantity)
    }

    /// Reads a range of input registers as `byte_count, words...`.
    pub fn read_input(&self, id: UnitId, start: u16, quantity: u16) -> Result<Vec<u8>, Exception> {
        let unit = self.unit(id).ok_or(Exception::IllegalDataAddress)?;
        let table = relock!(unit.input_registers.read());
        read_words(&table, start, quantity)
    }

    /// Reads from the table selected by `kind`.
    pub fn read(
        &self,
        id: UnitId,
        kind: RegisterKind,
        start: u16,
        quantity: u16,
    ) -> Result<Vec<u8>, Exception> {
        match kind {
            RegisterKind::Coils => self.read_coils(id, start, quantity),
            RegisterKind::DiscreteInputs => self.read_discrete_inputs(id, start, quantity),
            RegisterKind::HoldingRegisters => self.read_holding(id, start, quantity),
            RegisterKind::InputRegisters => self.read_input(id, start, quantity),
        }
    }
}

// =============================================================================
// Range Encoding
// =============================================================================

/// Copies a bit range and packs it LSB-first within each byte.
///
/// Bit `i` of byte `b` holds the value at `start + 8*b + i`. The first byte
/// of the result is the data byte count.
fn read_bits(table: &HashMap<u16, bool>, start: u16, quantity: u16) -> Result<Vec<u8>, Exception> {
    let mut bits = Vec::with_capacity(quantity as usize);
    for offset in 0..quantity {
        let address = start.checked_add(offset).ok_or(Exception::IllegalDataAddress)?;
        let value = table.get(&address).ok_or(Exception::IllegalDataAddress)?;
        bits.push(*value);
    }

    let mut data = Vec::with_capacity(bits.len().div_ceil(8));
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, bit) in chunk.iter().enumerate() {
            if *bit {
                byte |= 1 << i;
            }
        }
        data.push(byte);
    }

    let mut out = Vec::with_capacity(data.len() + 1);
    out.push(data.len() as u8);
    out.extend_from_slice(&data);
    Ok(out)
}

/// Copies a word range, each word big-endian, prefixed by the byte count.
fn read_words(table: &HashMap<u16, u16>, start: u16, quantity: u16) -> Result<Vec<u8>, Exception> {
    let mut data = Vec::with_capacity(quantity as usize * 2);
    for offset in 0..quantity {
        let address = start.checked_add(offset).ok_or(Exception::IllegalDataAddress)?;
        let value = table.get(&address).ok_or(Exception::IllegalDataAddress)?;
        data.extend_from_slice(&value.to_be_bytes());
    }

    let mut out = Vec::with_capacity(data.len() + 1);
    out.push(data.len() as u8);
    out.extend_from_slice(&data);
    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================
