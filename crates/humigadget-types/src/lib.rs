//! Platform-agnostic types for the Sensirion Smart Humigadget (SHT31).
//!
//! This crate provides the shared data model and payload decoding used by
//! the BLE client in humigadget-core, without depending on any Bluetooth
//! stack.
//!
//! # Features
//!
//! - The device data model ([`HumigadgetDevice`]) with identity fields and
//!   the sensor channel map
//! - Decoders for the raw characteristic payloads (LE float measurements,
//!   battery byte, UTF-8 and hex identity strings)
//! - UUID constants for the device's GATT profile
//! - Error types for payload decoding
//!
//! # Example
//!
//! ```
//! use humigadget_types::{decode_measurement, CHANNEL_TEMPERATURE, HumigadgetDevice, SensorValue};
//!
//! let payload = 21.5f32.to_le_bytes();
//! let temperature = decode_measurement(&payload).unwrap();
//!
//! let mut device = HumigadgetDevice::new();
//! device.set_sensor(CHANNEL_TEMPERATURE, SensorValue::Float(temperature));
//! assert_eq!(device.sensor(CHANNEL_TEMPERATURE), Some(SensorValue::Float(21.5)));
//! ```

pub mod error;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use types::{
    CHANNEL_BATTERY, CHANNEL_HUMIDITY, CHANNEL_TEMPERATURE, DEVICE_NAME, HumigadgetDevice,
    InfoField, MEASUREMENT_BYTES, SensorValue, decode_battery_level, decode_info_string,
    decode_measurement, decode_system_id,
};
pub use uuid as uuids;
