//! Bluetooth UUIDs for the Sensirion Smart Humigadget.
//!
//! This module contains all the UUIDs needed to communicate with the
//! Smart Humigadget (SHT31) over Bluetooth Low Energy. The table here is
//! the only bit-exact external contract of the crate.

use uuid::{Uuid, uuid};

use crate::types::InfoField;

// --- Standard BLE Service UUIDs ---

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Battery service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

// --- Device Information Characteristic UUIDs ---

/// System ID characteristic. Decoded as a hex string of the raw bytes.
pub const SYSTEM_ID: Uuid = uuid!("00002a23-0000-1000-8000-00805f9b34fb");

/// Model number string characteristic.
pub const MODEL_NUMBER: Uuid = uuid!("00002a24-0000-1000-8000-00805f9b34fb");

/// Serial number string characteristic.
pub const SERIAL_NUMBER: Uuid = uuid!("00002a25-0000-1000-8000-00805f9b34fb");

/// Firmware revision string characteristic.
pub const FIRMWARE_REVISION: Uuid = uuid!("00002a26-0000-1000-8000-00805f9b34fb");

/// Hardware revision string characteristic.
pub const HARDWARE_REVISION: Uuid = uuid!("00002a27-0000-1000-8000-00805f9b34fb");

/// Software revision string characteristic.
pub const SOFTWARE_REVISION: Uuid = uuid!("00002a28-0000-1000-8000-00805f9b34fb");

/// Manufacturer name string characteristic.
pub const MANUFACTURER_NAME: Uuid = uuid!("00002a29-0000-1000-8000-00805f9b34fb");

// --- Battery Characteristic UUIDs ---

/// Battery level characteristic (1 byte, 0-100).
pub const BATTERY_LEVEL: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");

// --- Sensirion Vendor Service UUIDs ---

/// Vendor-specific humidity service.
pub const HUMIDITY_SERVICE: Uuid = uuid!("00001234-b38d-4985-720e-0f993a68ee41");

/// Humidity measurement characteristic (4-byte LE float).
pub const HUMIDITY_MEASUREMENT: Uuid = uuid!("00001235-b38d-4985-720e-0f993a68ee41");

/// Vendor-specific temperature service.
pub const TEMPERATURE_SERVICE: Uuid = uuid!("00002234-b38d-4985-720e-0f993a68ee41");

/// Temperature measurement characteristic (4-byte LE float).
pub const TEMPERATURE_MEASUREMENT: Uuid = uuid!("00002235-b38d-4985-720e-0f993a68ee41");

/// The seven device-information characteristics read during initialization,
/// paired with the identity field each one populates.
pub const DEVICE_INFO_CHARACTERISTICS: [(Uuid, InfoField); 7] = [
    (SYSTEM_ID, InfoField::Identifier),
    (MODEL_NUMBER, InfoField::Model),
    (SERIAL_NUMBER, InfoField::Serial),
    (FIRMWARE_REVISION, InfoField::FirmwareRevision),
    (HARDWARE_REVISION, InfoField::HardwareRevision),
    (SOFTWARE_REVISION, InfoField::SoftwareRevision),
    (MANUFACTURER_NAME, InfoField::Manufacturer),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_service_uuid() {
        let expected = "0000180a-0000-1000-8000-00805f9b34fb";
        assert_eq!(DEVICE_INFO_SERVICE.to_string(), expected);
    }

    #[test]
    fn test_battery_service_uuid() {
        let expected = "0000180f-0000-1000-8000-00805f9b34fb";
        assert_eq!(BATTERY_SERVICE.to_string(), expected);
    }

    #[test]
    fn test_system_id_uuid() {
        let expected = "00002a23-0000-1000-8000-00805f9b34fb";
        assert_eq!(SYSTEM_ID.to_string(), expected);
    }

    #[test]
    fn test_model_number_uuid() {
        let expected = "00002a24-0000-1000-8000-00805f9b34fb";
        assert_eq!(MODEL_NUMBER.to_string(), expected);
    }

    #[test]
    fn test_serial_number_uuid() {
        let expected = "00002a25-0000-1000-8000-00805f9b34fb";
        assert_eq!(SERIAL_NUMBER.to_string(), expected);
    }

    #[test]
    fn test_revision_uuids() {
        assert_eq!(
            FIRMWARE_REVISION.to_string(),
            "00002a26-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            HARDWARE_REVISION.to_string(),
            "00002a27-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            SOFTWARE_REVISION.to_string(),
            "00002a28-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_manufacturer_name_uuid() {
        let expected = "00002a29-0000-1000-8000-00805f9b34fb";
        assert_eq!(MANUFACTURER_NAME.to_string(), expected);
    }

    #[test]
    fn test_battery_level_uuid() {
        let expected = "00002a19-0000-1000-8000-00805f9b34fb";
        assert_eq!(BATTERY_LEVEL.to_string(), expected);
    }

    #[test]
    fn test_vendor_humidity_uuids() {
        assert_eq!(
            HUMIDITY_SERVICE.to_string(),
            "00001234-b38d-4985-720e-0f993a68ee41"
        );
        assert_eq!(
            HUMIDITY_MEASUREMENT.to_string(),
            "00001235-b38d-4985-720e-0f993a68ee41"
        );
    }

    #[test]
    fn test_vendor_temperature_uuids() {
        assert_eq!(
            TEMPERATURE_SERVICE.to_string(),
            "00002234-b38d-4985-720e-0f993a68ee41"
        );
        assert_eq!(
            TEMPERATURE_MEASUREMENT.to_string(),
            "00002235-b38d-4985-720e-0f993a68ee41"
        );
    }

    #[test]
    fn test_vendor_service_uuids_are_distinct() {
        assert_ne!(HUMIDITY_SERVICE, TEMPERATURE_SERVICE);
        assert_ne!(HUMIDITY_MEASUREMENT, TEMPERATURE_MEASUREMENT);
    }

    #[test]
    fn test_device_info_table_covers_all_fields() {
        use std::collections::HashSet;

        let uuids: HashSet<_> = DEVICE_INFO_CHARACTERISTICS
            .iter()
            .map(|(uuid, _)| *uuid)
            .collect();
        assert_eq!(uuids.len(), 7);

        let fields: HashSet<_> = DEVICE_INFO_CHARACTERISTICS
            .iter()
            .map(|(_, field)| *field)
            .collect();
        assert_eq!(fields.len(), 7);
    }

    #[test]
    fn test_standard_ble_characteristic_prefix() {
        // Standard BLE characteristics use 16-bit UUIDs (start with 00002aXX)
        let standard_uuids = [
            SYSTEM_ID,
            MODEL_NUMBER,
            SERIAL_NUMBER,
            FIRMWARE_REVISION,
            HARDWARE_REVISION,
            SOFTWARE_REVISION,
            MANUFACTURER_NAME,
            BATTERY_LEVEL,
        ];

        for uuid in standard_uuids {
            assert!(
                uuid.to_string().starts_with("00002a"),
                "UUID {} should start with 00002a",
                uuid
            );
        }
    }
}
