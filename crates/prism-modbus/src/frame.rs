// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP wire codec.
//!
//! A Modbus TCP frame starts with the 7-byte MBAP header:
//!
//! ```text
//! +----------------+--------------+--------+---------+----------+
//! | transaction:u16| protocol:u16 | len:u16| unit:u8 | function |
//! +----------------+--------------+--------+---------+----------+
//!   0..2             2..4           4..6     6         7
//! ```
//!
//! For the read functions served by the bridge, bytes 8..12 carry the
//! starting address and quantity, both big-endian. All multi-byte fields on
//! the wire are big-endian.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Function Codes
// =============================================================================

/// Read Coils.
pub const READ_COILS: u8 = 0x01;
/// Read Discrete Inputs.
pub const READ_DISCRETE_INPUTS: u8 = 0x02;
/// Read Holding Registers.
pub const READ_HOLDING_REGISTERS: u8 = 0x03;
/// Read Input Registers.
pub const READ_INPUT_REGISTERS: u8 = 0x04;
/// Write Single Coil (recognized, no effect).
pub const WRITE_SINGLE_COIL: u8 = 0x05;
/// Write Single Register (recognized, no effect).
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
/// Write Multiple Coils (recognized, no effect).
pub const WRITE_MULTIPLE_COILS: u8 = 0x0F;
/// Write Multiple Registers (recognized, no effect).
pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Shortest acceptable request frame (MBAP + function + address + quantity).
pub const MIN_FRAME_LEN: usize = 12;
/// Longest acceptable request frame.
pub const MAX_FRAME_LEN: usize = 260;

/// Highest legal unit identifier on the wire.
pub const MAX_UNIT_ID: u8 = 247;

/// Largest quantity accepted for a single read.
///
/// This is the Modbus limit for bit reads, applied uniformly to register
/// reads as well.
pub const MAX_READ_QUANTITY: u16 = 2000;

// =============================================================================
// Exception
// =============================================================================

/// A Modbus exception code, sent with bit 7 of the function code set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Exception {
    /// The function code is not supported.
    IllegalFunction = 0x01,
    /// An address in the requested range does not exist.
    IllegalDataAddress = 0x02,
    /// A field of the request (e.g. quantity) is out of range.
    IllegalDataValue = 0x03,
    /// The unit identifier does not address a known device.
    SlaveDeviceFailure = 0x04,
}

impl Exception {
    /// Returns the wire code.
    #[inline]
    pub const fn code(&self) -> u8 {
        *self as u8
    }

    /// Returns the exception name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Exception::IllegalFunction => "IllegalFunction",
            Exception::IllegalDataAddress => "IllegalDataAddress",
            Exception::IllegalDataValue => "IllegalDataValue",
            Exception::SlaveDeviceFailure => "SlaveDeviceFailure",
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// RegisterKind
// =============================================================================

/// One of the four Modbus data tables, identified by its read function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterKind {
    /// Coils: single bits, read by function 0x01.
    Coils,
    /// Discrete inputs: single bits, read by function 0x02.
    DiscreteInputs,
    /// Holding registers: 16-bit words, read by function 0x03.
    HoldingRegisters,
    /// Input registers: 16-bit words, read by function 0x04.
    InputRegisters,
}

impl RegisterKind {
    /// Returns the read function code for this table.
    #[inline]
    pub const fn function_code(&self) -> u8 {
        match self {
            RegisterKind::Coils => READ_COILS,
            RegisterKind::DiscreteInputs => READ_DISCRETE_INPUTS,
            RegisterKind::HoldingRegisters => READ_HOLDING_REGISTERS,
            RegisterKind::InputRegisters => READ_INPUT_REGISTERS,
        }
    }

    /// Maps a read function code back to its table.
    pub const fn from_function_code(code: u8) -> Option<Self> {
        match code {
            READ_COILS => Some(RegisterKind::Coils),
            READ_DISCRETE_INPUTS => Some(RegisterKind::DiscreteInputs),
            READ_HOLDING_REGISTERS => Some(RegisterKind::HoldingRegisters),
            READ_INPUT_REGISTERS => Some(RegisterKind::InputRegisters),
            _ => None,
        }
    }

    /// Returns `true` for the single-bit tables.
    #[inline]
    pub const fn is_bit(&self) -> bool {
        matches!(self, RegisterKind::Coils | RegisterKind::DiscreteInputs)
    }

    /// Parses a table name as found in tag files.
    ///
    /// Matching is case-insensitive, trims surrounding whitespace, and
    /// accepts substrings (`"Holding Registers"` works) as well as the
    /// literal digits `"1"`..`"4"`. Anything else is `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use prism_modbus::frame::RegisterKind;
    ///
    /// assert_eq!(RegisterKind::parse("  COIL "), Some(RegisterKind::Coils));
    /// assert_eq!(RegisterKind::parse("discrete input"), Some(RegisterKind::DiscreteInputs));
    /// assert_eq!(RegisterKind::parse("3"), Some(RegisterKind::HoldingRegisters));
    /// assert_eq!(RegisterKind::parse("registers"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        if name.contains("coil") || name == "1" {
            Some(RegisterKind::Coils)
        } else if name.contains("discret") || name == "2" {
            Some(RegisterKind::DiscreteInputs)
        } else if name.contains("holding") || name == "3" {
            Some(RegisterKind::HoldingRegisters)
        } else if name.contains("input") || name == "4" {
            Some(RegisterKind::InputRegisters)
        } else {
            None
        }
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegisterKind::Coils => "coils",
            RegisterKind::DiscreteInputs => "discrete_inputs",
            RegisterKind::HoldingRegisters => "holding_registers",
            RegisterKind::InputRegisters => "input_registers",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// RequestFrame
// =============================================================================

/// A decoded Modbus TCP request.
///
/// Only the fields the bridge serves are extracted; write payloads beyond
/// byte 12 are accepted on the wire but never inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame {
    /// Transaction identifier, echoed into the response.
    pub transaction_id: u16,
    /// Protocol identifier, echoed into the response.
    pub protocol_id: u16,
    /// Raw unit identifier, unvalidated.
    pub unit_id: u8,
    /// Function code.
    pub function: u8,
    /// Starting address for read requests.
    pub starting_address: u16,
    /// Quantity for read requests.
    pub quantity: u16,
}

impl RequestFrame {
    /// Decodes a request frame.
    ///
    /// Returns `None` for frames outside 12..=260 bytes; such frames are
    /// unrecoverable because the protocol has no delimiter, so the caller
    /// must close the connection.
    pub fn decode(packet: &[u8]) -> Option<Self> {
        if packet.len() < MIN_FRAME_LEN || packet.len() > MAX_FRAME_LEN {
            return None;
        }

        Some(Self {
            transaction_id: u16::from_be_bytes([packet[0], packet[1]]),
            protocol_id: u16::from_be_bytes([packet[2], packet[3]]),
            unit_id: packet[6],
            function: packet[7],
            starting_address: u16::from_be_bytes([packet[8], packet[9]]),
            quantity: u16::from_be_bytes([packet[10], packet[11]]),
        })
    }

    /// Encodes a data response for this request.
    ///
    /// The MBAP length field covers unit id, function, and payload
    /// (`payload.len() + 2`). A read payload is `byte_count, data...`; the
    /// recognized write functions answer with an empty payload.
    pub fn data_response(&self, payload: &[u8]) -> Vec<u8> {
        let length = (payload.len() + 2) as u16;
        let mut raw = Vec::with_capacity(8 + payload.len());
        raw.extend_from_slice(&self.transaction_id.to_be_bytes());
        raw.extend_from_slice(&self.protocol_id.to_be_bytes());
        raw.extend_from_slice(&length.to_be_bytes());
        raw.push(self.unit_id);
        raw.push(self.function);
        raw.extend_from_slice(payload);
        raw
    }

    /// Encodes an exception response for this request.
    ///
    /// The function code is echoed with bit 7 set and the MBAP length is
    /// always 3.
    pub fn exception_response(&self, exception: Exception) -> Vec<u8> {
        let mut raw = Vec::with_capacity(9);
        raw.extend_from_slice(&self.transaction_id.to_be_bytes());
        raw.extend_from_slice(&self.protocol_id.to_be_bytes());
        raw.extend_from_slice(&3u16.to_be_bytes());
        raw.push(self.unit_id);
        raw.push(self.function | 0x80);
        raw.push(exception.code());
        raw
    }
}

// =============================================================================
// Tests
// =============================================================================
