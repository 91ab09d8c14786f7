//! High-level client operations against one Smart Humigadget.
//!
//! Each operation opens a fresh connection, performs its reads through a
//! [`ConnectionGuard`], and closes the guard before returning, so the
//! device is disconnected on the success path and the failure path alike.

use tracing::{error, info};

use humigadget_types::{
    CHANNEL_BATTERY, CHANNEL_HUMIDITY, CHANNEL_TEMPERATURE, DEVICE_NAME, HumigadgetDevice,
    InfoField, SensorValue, decode_battery_level, decode_info_string, decode_measurement,
    decode_system_id, uuids,
};

use crate::connection::{Connection, ConnectionConfig, ConnectionGuard};
use crate::error::Result;
use crate::gatt::GattReader;
use crate::scan::DeviceHandle;

/// Stateless client for Smart Humigadget devices.
///
/// Holds only configuration; all device state lives in the
/// [`HumigadgetDevice`] records it produces and updates.
///
/// # Example
///
/// ```no_run
/// use humigadget_core::client::HumigadgetClient;
/// use humigadget_core::scan::{self, ScanOptions};
///
/// # async fn example() -> humigadget_core::Result<()> {
/// let adapter = scan::get_adapter().await?;
/// let handle = scan::resolve_handle(&adapter, "AA:BB:CC:DD:EE:FF", &ScanOptions::default())
///     .await?
///     .ok_or_else(|| humigadget_core::Error::device_not_found("AA:BB:CC:DD:EE:FF"))?;
///
/// let client = HumigadgetClient::default();
/// let mut device = client.initialize(&handle).await?;
/// client.refresh(&handle, Some(&mut device)).await?;
/// println!("{:?}", device.sensor("temperature"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct HumigadgetClient {
    config: ConnectionConfig,
}

impl HumigadgetClient {
    /// Create a client with the given connection configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Read the device-information characteristics into a fresh record.
    ///
    /// Individual characteristics a firmware does not expose are logged
    /// and skipped; the corresponding identity fields stay empty. Only
    /// connection establishment or disconnect can fail this operation.
    #[tracing::instrument(level = "debug", skip_all, fields(address = %handle.address()))]
    pub async fn initialize(&self, handle: &DeviceHandle) -> Result<HumigadgetDevice> {
        let guard = ConnectionGuard::new(Connection::establish(handle, &self.config).await?);

        let mut device = HumigadgetDevice::new();
        apply_handle_identity(&mut device, handle);
        populate_device_info(&*guard, &mut device).await;

        guard.close().await?;
        info!(
            model = %device.model,
            firmware = %device.firmware_revision,
            "Initialized device"
        );
        Ok(device)
    }

    /// Read the battery, humidity, and temperature channels.
    ///
    /// On success the readings are written into `existing` (when given)
    /// and the updated record is returned. On failure `existing` is left
    /// untouched, so callers keep serving the previous readings.
    #[tracing::instrument(level = "debug", skip_all, fields(address = %handle.address()))]
    pub async fn refresh(
        &self,
        handle: &DeviceHandle,
        existing: Option<&mut HumigadgetDevice>,
    ) -> Result<HumigadgetDevice> {
        let guard = ConnectionGuard::new(Connection::establish(handle, &self.config).await?);

        let mut device = match &existing {
            Some(existing) => (**existing).clone(),
            None => {
                let mut fresh = HumigadgetDevice::new();
                apply_handle_identity(&mut fresh, handle);
                fresh
            }
        };

        let result = read_sensor_channels(&*guard, &mut device).await;
        let closed = guard.close().await;
        result?;
        closed?;

        if let Some(existing) = existing {
            *existing = device.clone();
        }
        Ok(device)
    }
}

/// Stamp the fixed name and scan-time identity onto a fresh record.
pub(crate) fn apply_handle_identity(device: &mut HumigadgetDevice, handle: &DeviceHandle) {
    device.name = DEVICE_NAME.to_string();
    device.advertised_name = handle
        .advertised_name()
        .map(str::to_string)
        .unwrap_or_default();
    device.address = handle.address().to_string();
}

/// Read the seven device-information characteristics into `device`.
///
/// Best-effort per field: a read failure leaves that field at its current
/// value and moves on.
pub(crate) async fn populate_device_info<G>(gatt: &G, device: &mut HumigadgetDevice)
where
    G: GattReader + ?Sized,
{
    for (uuid, field) in uuids::DEVICE_INFO_CHARACTERISTICS {
        match gatt.read_characteristic(uuid).await {
            Ok(data) => {
                let value = match field {
                    InfoField::Identifier => decode_system_id(&data),
                    _ => decode_info_string(&data),
                };
                device.set_info_field(field, value);
            }
            Err(e) => {
                error!(field = %field, error = %e, "Error reading device info characteristic");
            }
        }
    }
}

/// Read and decode the three sensor channels into `device`.
///
/// Unlike device info, a failed read or decode here aborts the whole
/// refresh; a poll cycle is only a success if every channel was read.
pub(crate) async fn read_sensor_channels<G>(gatt: &G, device: &mut HumigadgetDevice) -> Result<()>
where
    G: GattReader + ?Sized,
{
    let data = gatt.read_characteristic(uuids::BATTERY_LEVEL).await?;
    let battery = decode_battery_level(&data)?;
    device.set_sensor(CHANNEL_BATTERY, SensorValue::Int(battery));

    let data = gatt.read_characteristic(uuids::HUMIDITY_MEASUREMENT).await?;
    let humidity = decode_measurement(&data)?;
    device.set_sensor(CHANNEL_HUMIDITY, SensorValue::Float(humidity));

    let data = gatt
        .read_characteristic(uuids::TEMPERATURE_MEASUREMENT)
        .await?;
    let temperature = decode_measurement(&data)?;
    device.set_sensor(CHANNEL_TEMPERATURE, SensorValue::Float(temperature));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::MockGatt;

    #[tokio::test]
    async fn test_populate_device_info_full_profile() {
        let mock = MockGatt::humigadget();
        let mut device = HumigadgetDevice::new();

        populate_device_info(&mock, &mut device).await;

        assert_eq!(device.identifier, "deadbeef00112233");
        assert_eq!(device.model, "SHT31 Smart Gadget");
        assert_eq!(device.serial, "1234567890");
        assert_eq!(device.firmware_revision, "1.3");
        assert_eq!(device.hardware_revision, "1.0");
        assert_eq!(device.software_revision, "1.0");
        assert_eq!(device.manufacturer, "Sensirion AG");
        assert_eq!(mock.read_count(), 7);
    }

    #[tokio::test]
    async fn test_populate_device_info_tolerates_missing_fields() {
        let mock = MockGatt::humigadget()
            .without_characteristic(uuids::SERIAL_NUMBER)
            .with_failing(uuids::SOFTWARE_REVISION);
        let mut device = HumigadgetDevice::new();

        populate_device_info(&mock, &mut device).await;

        // Failed fields stay empty, the rest populate normally.
        assert_eq!(device.serial, "");
        assert_eq!(device.software_revision, "");
        assert_eq!(device.model, "SHT31 Smart Gadget");
        assert_eq!(device.manufacturer, "Sensirion AG");
        assert_eq!(mock.read_count(), 7);
    }

    #[tokio::test]
    async fn test_read_sensor_channels() {
        let mock = MockGatt::humigadget();
        let mut device = HumigadgetDevice::new();

        read_sensor_channels(&mock, &mut device).await.unwrap();

        assert_eq!(device.sensor(CHANNEL_BATTERY), Some(SensorValue::Int(87)));
        assert_eq!(
            device.sensor(CHANNEL_HUMIDITY),
            Some(SensorValue::Float(45.25))
        );
        assert_eq!(
            device.sensor(CHANNEL_TEMPERATURE),
            Some(SensorValue::Float(21.5))
        );
        assert_eq!(
            mock.reads(),
            vec![
                uuids::BATTERY_LEVEL,
                uuids::HUMIDITY_MEASUREMENT,
                uuids::TEMPERATURE_MEASUREMENT,
            ]
        );
    }

    #[tokio::test]
    async fn test_read_sensor_channels_failure_propagates() {
        let mock = MockGatt::humigadget().with_failing(uuids::HUMIDITY_MEASUREMENT);
        let mut device = HumigadgetDevice::new();

        let err = read_sensor_channels(&mock, &mut device).await.unwrap_err();
        assert!(matches!(err, Error::Bluetooth(_)));

        // Battery was read before the failure; the later channels were not.
        assert_eq!(device.sensor(CHANNEL_BATTERY), Some(SensorValue::Int(87)));
        assert_eq!(device.sensor(CHANNEL_TEMPERATURE), None);
    }

    #[tokio::test]
    async fn test_read_sensor_channels_decode_failure() {
        let mock =
            MockGatt::humigadget().with_characteristic(uuids::TEMPERATURE_MEASUREMENT, vec![0x00]);
        let mut device = HumigadgetDevice::new();

        let err = read_sensor_channels(&mock, &mut device).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_refresh_keeps_identity_across_polls() {
        let mock = MockGatt::humigadget();
        let mut device = HumigadgetDevice::new();
        device.name = DEVICE_NAME.to_string();
        device.identifier = "deadbeef00112233".to_string();

        read_sensor_channels(&mock, &mut device).await.unwrap();

        assert_eq!(device.name, DEVICE_NAME);
        assert_eq!(device.identifier, "deadbeef00112233");
        assert_eq!(device.sensors.len(), 3);
    }
}
