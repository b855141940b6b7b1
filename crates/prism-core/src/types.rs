// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for PRISM.
//!
//! This module provides the protocol-agnostic types shared between the
//! OPC UA ingest path and the Modbus serving path.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// UnitId
// =============================================================================

/// A Modbus unit identifier (slave address) in the range 1..=247.
///
/// Unit identifiers address one register bank inside the bridge. The values
/// 0 (broadcast) and 248..=255 (reserved) are never valid bank keys; frames
/// carrying them are answered with `SlaveDeviceFailure` by the slave engine.
///
/// # Examples
///
/// ```
/// use prism_core::types::UnitId;
///
/// let id = UnitId::new(1).unwrap();
/// assert_eq!(id.get(), 1);
/// assert!(UnitId::new(0).is_none());
/// assert!(UnitId::new(248).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(u8);

impl UnitId {
    /// The lowest valid unit identifier.
    pub const MIN: u8 = 1;

    /// The highest valid unit identifier.
    pub const MAX: u8 = 247;

    /// Creates a unit identifier, returning `None` outside 1..=247.
    #[inline]
    pub fn new(id: u8) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Returns the raw unit identifier.
    #[inline]
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for UnitId {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, u8> {
        Self::new(id).ok_or(id)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed value received from an upstream server.
///
/// OPC UA data changes arrive as a tagged union over boolean and numeric
/// primitives of varying width. The projector consumes the boolean and
/// numeric tags; the remaining tags exist so non-projectable payloads can be
/// carried to the drop-and-log path without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Boolean value
    Bool(bool),

    /// Signed 8-bit integer
    Int8(i8),

    /// Signed 16-bit integer
    Int16(i16),

    /// Signed 32-bit integer
    Int32(i32),

    /// Signed 64-bit integer
    Int64(i64),

    /// Unsigned 8-bit integer
    UInt8(u8),

    /// Unsigned 16-bit integer
    UInt16(u16),

    /// Unsigned 32-bit integer
    UInt32(u32),

    /// Unsigned 64-bit integer
    UInt64(u64),

    /// 32-bit floating point
    Float32(f32),

    /// 64-bit floating point
    Float64(f64),

    /// UTF-8 string (not projectable onto registers)
    String(String),

    /// Date and time with timezone (not projectable onto registers)
    DateTime(DateTime<Utc>),

    /// Null/undefined value
    Null,
}

impl Value {
    /// Returns the type name of this value.
    ///
    /// # Examples
    ///
    /// ```
    /// use prism_core::types::Value;
    ///
    /// assert_eq!(Value::Float64(1.0).type_name(), "float64");
    /// assert_eq!(Value::Bool(true).type_name(), "bool");
    /// ```
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt8(_) => "uint8",
            Value::UInt16(_) => "uint16",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Null => "null",
        }
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if this is a numeric value (integer or float).
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int8(_)
                | Value::Int16(_)
                | Value::Int32(_)
                | Value::Int64(_)
                | Value::UInt8(_)
                | Value::UInt16(_)
                | Value::UInt32(_)
                | Value::UInt64(_)
                | Value::Float32(_)
                | Value::Float64(_)
        )
    }

    /// Attempts to convert this value to a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Null => write!(f, "null"),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

macro_rules! impl_from_for_value {
    ($variant:ident, $type:ty) => {
        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from_for_value!(Bool, bool);
impl_from_for_value!(Int8, i8);
impl_from_for_value!(Int16, i16);
impl_from_for_value!(Int32, i32);
impl_from_for_value!(Int64, i64);
impl_from_for_value!(UInt8, u8);
impl_from_for_value!(UInt16, u16);
impl_from_for_value!(UInt32, u32);
impl_from_for_value!(UInt64, u64);
impl_from_for_value!(Float32, f32);
impl_from_for_value!(Float64, f64);
impl_from_for_value!(String, String);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

// =============================================================================
// DeviceStatus
// =============================================================================

/// The lifecycle status of an upstream OPC UA device.
///
/// A device advances one state at a time, driven by the reconciliation
/// loop; a failed transition records the error on the device and leaves
/// the status in place for the next tick. Subscription loss falls back to
/// [`DeviceStatus::ReadyOptions`], keeping the already-loaded tag catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Connection parameters parsed from the PLC list.
    #[default]
    Configured,

    /// Tag catalog loaded from the device's tag file.
    ReadTags,

    /// Endpoint discovered and client options assembled.
    ReadyOptions,

    /// Session established and liveness probe succeeded.
    Connected,

    /// Live subscription delivering data changes.
    Subscribed,
}

impl DeviceStatus {
    /// Returns the status name as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Configured => "Configured",
            DeviceStatus::ReadTags => "ReadTags",
            DeviceStatus::ReadyOptions => "ReadyOptions",
            DeviceStatus::Connected => "Connected",
            DeviceStatus::Subscribed => "Subscribed",
        }
    }

    /// Returns `true` if a subscription task owns this device.
    #[inline]
    pub fn is_subscribed(&self) -> bool {
        matches!(self, DeviceStatus::Subscribed)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_id_range() {
        assert!(UnitId::new(0).is_none());
        assert_eq!(UnitId::new(1).unwrap().get(), 1);
        assert_eq!(UnitId::new(247).unwrap().get(), 247);
        assert!(UnitId::new(248).is_none());
        assert!(UnitId::new(255).is_none());
    }

    #[test]
    fn test_unit_id_try_from() {
        assert!(UnitId::try_from(10).is_ok());
        assert_eq!(UnitId::try_from(0), Err(0));
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Bool(true).type_name(), "bool");
        assert_eq!(Value::Int32(42).type_name(), "int32");
        assert_eq!(Value::UInt64(7).type_name(), "uint64");
        assert_eq!(Value::Float32(1.0).type_name(), "float32");
        assert_eq!(Value::Null.type_name(), "null");
    }

    #[test]
    fn test_value_predicates() {
        assert!(Value::Int8(-1).is_numeric());
        assert!(Value::Float64(0.5).is_numeric());
        assert!(!Value::Bool(false).is_numeric());
        assert!(!Value::String("x".into()).is_numeric());
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int16(1).as_bool(), None);
    }

    #[test]
    fn test_value_from() {
        let v: Value = 42u16.into();
        assert!(matches!(v, Value::UInt16(42)));

        let v: Value = 3.5f32.into();
        assert!(matches!(v, Value::Float32(_)));
    }

    #[test]
    fn test_device_status_order() {
        assert!(DeviceStatus::Configured < DeviceStatus::ReadTags);
        assert!(DeviceStatus::ReadTags < DeviceStatus::ReadyOptions);
        assert!(DeviceStatus::ReadyOptions < DeviceStatus::Connected);
        assert!(DeviceStatus::Connected < DeviceStatus::Subscribed);
    }

    #[test]
    fn test_device_status_display() {
        assert_eq!(DeviceStatus::Configured.to_string(), "Configured");
        assert_eq!(DeviceStatus::Subscribed.to_string(), "Subscribed");
        assert!(DeviceStatus::Subscribed.is_subscribed());
        assert!(!DeviceStatus::Connected.is_subscribed());
    }
}
