//! Core types and payload decoding for Smart Humigadget sensor data.

use core::fmt;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Fixed friendly name applied to every initialized device.
pub const DEVICE_NAME: &str = "Sensirion SHT31";

/// Sensor channel key for temperature readings.
pub const CHANNEL_TEMPERATURE: &str = "temperature";

/// Sensor channel key for relative humidity readings.
pub const CHANNEL_HUMIDITY: &str = "humidity";

/// Sensor channel key for battery level readings.
pub const CHANNEL_BATTERY: &str = "battery";

/// Number of bytes in a vendor measurement payload (LE IEEE-754 float).
pub const MEASUREMENT_BYTES: usize = 4;

/// Identity field populated from a device-information characteristic.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new fields
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum InfoField {
    /// System ID, decoded as a hex string of the raw bytes.
    Identifier,
    /// Model number string.
    Model,
    /// Serial number string.
    Serial,
    /// Firmware revision string.
    FirmwareRevision,
    /// Hardware revision string.
    HardwareRevision,
    /// Software revision string.
    SoftwareRevision,
    /// Manufacturer name string.
    Manufacturer,
}

impl fmt::Display for InfoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InfoField::Identifier => "identifier",
            InfoField::Model => "model",
            InfoField::Serial => "serial",
            InfoField::FirmwareRevision => "firmware_revision",
            InfoField::HardwareRevision => "hardware_revision",
            InfoField::SoftwareRevision => "software_revision",
            InfoField::Manufacturer => "manufacturer",
        };
        write!(f, "{}", name)
    }
}

/// The last-read value of one sensor channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorValue {
    /// Floating-point measurement (temperature in °C, humidity in %).
    Float(f32),
    /// Integer measurement (battery percentage, 0-100).
    Int(u8),
}

impl SensorValue {
    /// The value widened to `f64`, for unit-agnostic consumers.
    pub fn as_f64(&self) -> f64 {
        match self {
            SensorValue::Float(v) => f64::from(*v),
            SensorValue::Int(v) => f64::from(*v),
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Float(v) => write!(f, "{}", v),
            SensorValue::Int(v) => write!(f, "{}", v),
        }
    }
}

/// In-memory record describing one physical Smart Humigadget.
///
/// Identity fields default to empty strings and are populated from the
/// device-information characteristics exactly once, at initialization.
/// The sensor map only grows or updates existing keys; a channel is never
/// removed once observed. One instance exists per configured device and
/// is mutated in place on every poll.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HumigadgetDevice {
    /// Fixed friendly name ("Sensirion SHT31").
    pub name: String,
    /// Name seen in the BLE advertisement (e.g. "Smart Humigadget").
    pub advertised_name: String,
    /// System ID, hex-encoded.
    pub identifier: String,
    /// Bluetooth address (or platform identifier where MACs are hidden).
    pub address: String,
    /// Manufacturer name string.
    pub manufacturer: String,
    /// Model number string.
    pub model: String,
    /// Serial number string.
    pub serial: String,
    /// Firmware revision string.
    pub firmware_revision: String,
    /// Hardware revision string.
    pub hardware_revision: String,
    /// Software revision string.
    pub software_revision: String,
    /// Channel name to last-read value. Absent key = never read.
    pub sensors: HashMap<String, SensorValue>,
}

impl HumigadgetDevice {
    /// Create an empty device record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the last-read value for a sensor channel.
    pub fn sensor(&self, key: &str) -> Option<SensorValue> {
        self.sensors.get(key).copied()
    }

    /// Insert or update a sensor channel value.
    pub fn set_sensor(&mut self, key: impl Into<String>, value: SensorValue) {
        self.sensors.insert(key.into(), value);
    }

    /// Write a decoded device-information value into its identity field.
    pub fn set_info_field(&mut self, field: InfoField, value: String) {
        match field {
            InfoField::Identifier => self.identifier = value,
            InfoField::Model => self.model = value,
            InfoField::Serial => self.serial = value,
            InfoField::FirmwareRevision => self.firmware_revision = value,
            InfoField::HardwareRevision => self.hardware_revision = value,
            InfoField::SoftwareRevision => self.software_revision = value,
            InfoField::Manufacturer => self.manufacturer = value,
        }
    }

    /// Read back an identity field, mainly for logging and tests.
    pub fn info_field(&self, field: InfoField) -> &str {
        match field {
            InfoField::Identifier => &self.identifier,
            InfoField::Model => &self.model,
            InfoField::Serial => &self.serial,
            InfoField::FirmwareRevision => &self.firmware_revision,
            InfoField::HardwareRevision => &self.hardware_revision,
            InfoField::SoftwareRevision => &self.software_revision,
            InfoField::Manufacturer => &self.manufacturer,
        }
    }
}

/// Decode a vendor measurement payload (temperature or humidity).
///
/// The payload is exactly 4 bytes: an IEEE-754 single-precision float in
/// little-endian byte order. The result is rounded to 2 decimal places.
///
/// # Errors
///
/// Returns [`ParseError::InvalidLength`] if `data` is not exactly
/// [`MEASUREMENT_BYTES`] (4) bytes.
#[must_use = "parsing returns a Result that should be handled"]
pub fn decode_measurement(data: &[u8]) -> ParseResult<f32> {
    use bytes::Buf;

    if data.len() != MEASUREMENT_BYTES {
        return Err(ParseError::InvalidLength {
            expected: MEASUREMENT_BYTES,
            actual: data.len(),
        });
    }

    let mut buf = data;
    let raw = buf.get_f32_le();
    Ok((raw * 100.0).round() / 100.0)
}

/// Decode a battery level payload.
///
/// The first byte is the battery percentage as an unsigned integer.
/// Real devices report 0-100; the full 0-255 range decodes faithfully.
///
/// # Errors
///
/// Returns [`ParseError::EmptyPayload`] if `data` is empty.
#[must_use = "parsing returns a Result that should be handled"]
pub fn decode_battery_level(data: &[u8]) -> ParseResult<u8> {
    match data.first() {
        Some(level) => Ok(*level),
        None => Err(ParseError::EmptyPayload),
    }
}

/// Decode a device-information string characteristic.
///
/// Invalid UTF-8 sequences are replaced rather than treated as fatal, and
/// trailing NUL padding is stripped.
pub fn decode_info_string(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_end_matches('\0')
        .to_string()
}

/// Decode a system-ID characteristic as a lowercase hex string.
pub fn decode_system_id(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{:02x}", byte)).collect()
}
