//! Mock GATT peer for testing without BLE hardware.
//!
//! [`MockGatt`] serves canned characteristic payloads through the
//! [`GattReader`](crate::gatt::GattReader) seam, so client logic and
//! coordinator plumbing can run under plain `#[tokio::test]`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use humigadget_types::uuids;

use crate::error::{Error, Result};
use crate::gatt::GattReader;

/// A scripted GATT peer.
///
/// Reads return the configured payload for a UUID, fail with a BLE error
/// for UUIDs marked failing, and report "characteristic not found" for
/// everything else. All reads are recorded for assertions.
#[derive(Debug, Default)]
pub struct MockGatt {
    characteristics: HashMap<Uuid, Vec<u8>>,
    failing: HashSet<Uuid>,
    read_count: AtomicU32,
    reads: Mutex<Vec<Uuid>>,
}

impl MockGatt {
    /// An empty peer with no characteristics.
    pub fn new() -> Self {
        Self::default()
    }

    /// A peer scripted with a full, healthy Smart Humigadget profile.
    pub fn humigadget() -> Self {
        Self::new()
            .with_characteristic(
                uuids::SYSTEM_ID,
                vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x11, 0x22, 0x33],
            )
            .with_characteristic(uuids::MODEL_NUMBER, b"SHT31 Smart Gadget\0".to_vec())
            .with_characteristic(uuids::SERIAL_NUMBER, b"1234567890".to_vec())
            .with_characteristic(uuids::FIRMWARE_REVISION, b"1.3".to_vec())
            .with_characteristic(uuids::HARDWARE_REVISION, b"1.0".to_vec())
            .with_characteristic(uuids::SOFTWARE_REVISION, b"1.0".to_vec())
            .with_characteristic(uuids::MANUFACTURER_NAME, b"Sensirion AG".to_vec())
            .with_characteristic(uuids::BATTERY_LEVEL, vec![87])
            .with_characteristic(
                uuids::HUMIDITY_MEASUREMENT,
                45.25_f32.to_le_bytes().to_vec(),
            )
            .with_characteristic(
                uuids::TEMPERATURE_MEASUREMENT,
                21.5_f32.to_le_bytes().to_vec(),
            )
    }

    /// Script a characteristic payload.
    #[must_use]
    pub fn with_characteristic(mut self, uuid: Uuid, data: Vec<u8>) -> Self {
        self.characteristics.insert(uuid, data);
        self
    }

    /// Make reads of `uuid` fail with a BLE error.
    #[must_use]
    pub fn with_failing(mut self, uuid: Uuid) -> Self {
        self.failing.insert(uuid);
        self
    }

    /// Remove a characteristic, as if the firmware did not expose it.
    #[must_use]
    pub fn without_characteristic(mut self, uuid: Uuid) -> Self {
        self.characteristics.remove(&uuid);
        self
    }

    /// Total number of reads attempted.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::SeqCst)
    }

    /// The UUIDs read so far, in order.
    pub fn reads(&self) -> Vec<Uuid> {
        self.reads.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GattReader for MockGatt {
    async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut reads) = self.reads.lock() {
            reads.push(uuid);
        }

        if self.failing.contains(&uuid) {
            return Err(Error::Bluetooth(btleplug::Error::NotConnected));
        }
        self.characteristics
            .get(&uuid)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(uuid.to_string(), 0))
    }
}
