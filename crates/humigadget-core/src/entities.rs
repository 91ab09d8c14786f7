//! Sensor entity descriptions and publishing.
//!
//! Maps the sensor channels cached by a [`PollCoordinator`] to typed
//! entities a frontend can display: temperature in °C, relative humidity
//! in %, battery level in %. Channels without a description are skipped.

use std::sync::Arc;

use tracing::debug;

use humigadget_types::{
    CHANNEL_BATTERY, CHANNEL_HUMIDITY, CHANNEL_TEMPERATURE, HumigadgetDevice, SensorValue,
};

use crate::coordinator::PollCoordinator;

/// Unit of measurement for a published sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Degrees Celsius.
    Celsius,
    /// Percent.
    Percent,
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Celsius => f.write_str("°C"),
            Self::Percent => f.write_str("%"),
        }
    }
}

/// Device class of a published sensor, for frontend presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorDeviceClass {
    /// A temperature reading.
    Temperature,
    /// A relative humidity reading.
    Humidity,
    /// A battery charge level.
    Battery,
}

impl std::fmt::Display for SensorDeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temperature => f.write_str("temperature"),
            Self::Humidity => f.write_str("humidity"),
            Self::Battery => f.write_str("battery"),
        }
    }
}

/// Static description of one publishable sensor channel.
#[derive(Debug, Clone, Copy)]
pub struct SensorEntityDescription {
    /// Channel key in the device's sensor map.
    pub key: &'static str,
    /// Human-readable entity name.
    pub name: &'static str,
    /// Unit of measurement.
    pub unit: Unit,
    /// Device class for presentation.
    pub device_class: SensorDeviceClass,
}

/// The channels this crate knows how to publish.
pub const SENSOR_DESCRIPTIONS: [SensorEntityDescription; 3] = [
    SensorEntityDescription {
        key: CHANNEL_TEMPERATURE,
        name: "Temperature",
        unit: Unit::Celsius,
        device_class: SensorDeviceClass::Temperature,
    },
    SensorEntityDescription {
        key: CHANNEL_HUMIDITY,
        name: "Humidity",
        unit: Unit::Percent,
        device_class: SensorDeviceClass::Humidity,
    },
    SensorEntityDescription {
        key: CHANNEL_BATTERY,
        name: "Battery",
        unit: Unit::Percent,
        device_class: SensorDeviceClass::Battery,
    },
];

/// Look up the description for a sensor channel key.
pub fn description_for(key: &str) -> Option<&'static SensorEntityDescription> {
    SENSOR_DESCRIPTIONS
        .iter()
        .find(|description| description.key == key)
}

/// How the entity's device is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Bluetooth Low Energy.
    Bluetooth,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bluetooth => f.write_str("bluetooth"),
        }
    }
}

/// Identity shared by all entities of one physical device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMetadata {
    /// Transport used to reach the device.
    pub connection: ConnectionType,
    /// Device address.
    pub address: String,
    /// Friendly device name.
    pub name: String,
    /// Manufacturer name string.
    pub manufacturer: String,
    /// Model number string.
    pub model: String,
    /// Hardware revision string.
    pub hw_version: String,
    /// Software revision string.
    pub sw_version: String,
}

impl DeviceMetadata {
    /// Build metadata from an initialized device record.
    pub fn from_device(device: &HumigadgetDevice) -> Self {
        Self {
            connection: ConnectionType::Bluetooth,
            address: device.address.clone(),
            name: device.name.clone(),
            manufacturer: device.manufacturer.clone(),
            model: device.model.clone(),
            hw_version: device.hardware_revision.clone(),
            sw_version: device.software_revision.clone(),
        }
    }
}

/// One published sensor reading backed by a coordinator's cache.
#[derive(Debug, Clone)]
pub struct SensorEntity {
    coordinator: Arc<PollCoordinator>,
    description: &'static SensorEntityDescription,
    unique_id: String,
    metadata: DeviceMetadata,
}

impl SensorEntity {
    /// The entity's static description.
    pub fn description(&self) -> &'static SensorEntityDescription {
        self.description
    }

    /// Stable unique identifier derived from the device identity.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Identity of the device this entity belongs to.
    pub fn metadata(&self) -> &DeviceMetadata {
        &self.metadata
    }

    /// The current reading, or `None` if the channel was never read.
    pub async fn native_value(&self) -> Option<SensorValue> {
        self.coordinator.data().await.sensor(self.description.key)
    }

    /// Whether the most recent poll cycle succeeded.
    pub async fn available(&self) -> bool {
        self.coordinator.last_update_success().await
    }
}

/// Build entities for every known channel the coordinator has observed.
///
/// Channels in the sensor map without a description are logged and
/// skipped. Entities come back sorted by channel key so the output is
/// deterministic.
pub async fn build_entities(coordinator: &Arc<PollCoordinator>) -> Vec<SensorEntity> {
    let device = coordinator.data().await;
    let metadata = DeviceMetadata::from_device(&device);

    let mut entities = Vec::new();
    for key in device.sensors.keys() {
        let Some(description) = description_for(key) else {
            debug!(key = %key, "No entity description for sensor channel, skipping");
            continue;
        };
        entities.push(SensorEntity {
            coordinator: Arc::clone(coordinator),
            description,
            unique_id: format!("{} {}_{}", device.name, device.identifier, description.key),
            metadata: metadata.clone(),
        });
    }
    entities.sort_by_key(|entity| entity.description.key);
    entities
}
