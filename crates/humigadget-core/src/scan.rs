//! Device discovery and address resolution.
//!
//! Discovery filters scan results by the advertised name prefix the
//! Smart Humigadget broadcasts, connects to each new candidate to read
//! its identity, and reports a structured [`DiscoveryAbort`] when the
//! flow cannot produce any candidate.

use std::collections::HashSet;
use std::time::Duration;

use btleplug::api::{Central as _, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::sleep;
use tracing::{debug, info};

use humigadget_types::HumigadgetDevice;

use crate::client::HumigadgetClient;
use crate::error::{DeviceNotFoundReason, Error, Result};

/// Advertised name prefix broadcast by Smart Humigadget devices.
pub const NAME_PREFIX: &str = "Smart Humigadget";

/// Default scan window.
const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);

/// Returns true if an advertised local name belongs to a Smart Humigadget.
pub fn is_humigadget_name(name: &str) -> bool {
    name.starts_with(NAME_PREFIX)
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Options controlling a BLE scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan before collecting results.
    pub duration: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_SCAN_DURATION,
        }
    }
}

impl ScanOptions {
    /// Create scan options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// A resolved reference to one physical device on one adapter.
///
/// Produced by [`resolve_handle`] or discovery; consumed by
/// [`HumigadgetClient`](crate::client::HumigadgetClient) operations, which
/// open a fresh connection per operation.
#[derive(Clone)]
pub struct DeviceHandle {
    pub(crate) adapter: Adapter,
    pub(crate) peripheral: Peripheral,
    pub(crate) address: String,
    pub(crate) advertised_name: Option<String>,
}

impl DeviceHandle {
    /// The device address or platform identifier.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The local name seen in the advertisement, if any.
    pub fn advertised_name(&self) -> Option<&str> {
        self.advertised_name.as_deref()
    }

    pub(crate) fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub(crate) fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("address", &self.address)
            .field("advertised_name", &self.advertised_name)
            .finish_non_exhaustive()
    }
}

/// Strip separators and case from an address so platform variants compare
/// equal ("aa:bb:cc:dd:ee:ff" == "AA-BB-CC-DD-EE-FF").
pub(crate) fn normalize_address(address: &str) -> String {
    address
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

async fn scan_peripherals(adapter: &Adapter, options: &ScanOptions) -> Result<Vec<Peripheral>> {
    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;
    Ok(adapter.peripherals().await?)
}

/// Resolve a configured address to a live [`DeviceHandle`].
///
/// Returns `Ok(None)` when the scan finishes without seeing the address;
/// callers decide whether that is fatal or worth retrying later.
#[tracing::instrument(level = "debug", skip(adapter, options))]
pub async fn resolve_handle(
    adapter: &Adapter,
    address: &str,
    options: &ScanOptions,
) -> Result<Option<DeviceHandle>> {
    let wanted = normalize_address(address);
    let peripherals = scan_peripherals(adapter, options).await?;
    debug!("Scan finished, {} peripherals visible", peripherals.len());

    for peripheral in peripherals {
        let Some(properties) = peripheral.properties().await? else {
            continue;
        };
        let seen = properties.address.to_string();
        if normalize_address(&seen) == wanted || peripheral.id().to_string() == address {
            return Ok(Some(DeviceHandle {
                adapter: adapter.clone(),
                peripheral,
                address: seen,
                advertised_name: properties.local_name,
            }));
        }
    }

    Ok(None)
}

/// One device found and interrogated during discovery.
#[derive(Debug, Clone)]
pub struct DiscoveredCandidate {
    /// The device address or platform identifier.
    pub address: String,
    /// Fixed device name suitable for display.
    pub name: String,
    /// The local name seen in the advertisement.
    pub advertised_name: Option<String>,
    /// Signal strength at scan time, if reported.
    pub rssi: Option<i16>,
    /// Device model populated from the device information service.
    pub device: HumigadgetDevice,
}

/// Why a discovery flow stopped without producing a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryAbort {
    /// The scan finished without seeing any new Smart Humigadget.
    NoDevicesFound,
    /// A candidate was seen but could not be connected to or read.
    CannotConnect,
    /// Discovery failed for a reason outside BLE transport.
    Unknown,
}

impl DiscoveryAbort {
    /// Stable machine-readable reason code for this abort.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NoDevicesFound => "no_devices_found",
            Self::CannotConnect => "cannot_connect",
            Self::Unknown => "unknown",
        }
    }

    /// Map an operational error to the abort reason discovery reports.
    ///
    /// Transport-level failures (adapter, connection, timeout, device gone
    /// mid-flow) read as "cannot connect"; anything else is unexpected.
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Bluetooth(_)
            | Error::ConnectionFailed { .. }
            | Error::Timeout { .. }
            | Error::NotConnected
            | Error::DeviceNotFound(_) => Self::CannotConnect,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for DiscoveryAbort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason_code())
    }
}

impl std::error::Error for DiscoveryAbort {}

/// What a scan saw of one peripheral, before any connection.
pub(crate) struct SeenAdvertisement {
    pub(crate) address: String,
    pub(crate) local_name: Option<String>,
    pub(crate) rssi: Option<i16>,
}

/// Filter seen advertisements and interrogate the survivors.
///
/// Generic over the interrogation step so the flow branches (abort
/// mapping, empty result) run in tests against a scripted GATT peer
/// instead of a live adapter.
pub(crate) async fn collect_candidates<T, F, Fut>(
    seen: Vec<(T, SeenAdvertisement)>,
    known_addresses: &HashSet<String>,
    interrogate: F,
) -> std::result::Result<Vec<DiscoveredCandidate>, DiscoveryAbort>
where
    F: Fn(T) -> Fut,
    Fut: std::future::Future<Output = Result<HumigadgetDevice>>,
{
    let known: HashSet<String> = known_addresses
        .iter()
        .map(|address| normalize_address(address))
        .collect();

    let mut candidates = Vec::new();
    for (target, advertisement) in seen {
        let Some(local_name) = advertisement.local_name else {
            continue;
        };
        if !is_humigadget_name(&local_name) {
            continue;
        }
        if known.contains(&normalize_address(&advertisement.address)) {
            debug!(address = %advertisement.address, "Skipping already configured device");
            continue;
        }

        let device = interrogate(target)
            .await
            .map_err(|e| DiscoveryAbort::from_error(&e))?;
        info!(address = %advertisement.address, name = %local_name, "Discovered Smart Humigadget");

        candidates.push(DiscoveredCandidate {
            address: advertisement.address,
            name: device.name.clone(),
            advertised_name: Some(local_name),
            rssi: advertisement.rssi,
            device,
        });
    }

    if candidates.is_empty() {
        return Err(DiscoveryAbort::NoDevicesFound);
    }
    Ok(candidates)
}

/// Scan for new Smart Humigadget devices and read their identity.
///
/// Peripherals whose advertised name does not start with [`NAME_PREFIX`],
/// or whose address is already in `known_addresses`, are skipped. Every
/// remaining candidate is connected to and its device information read;
/// any failure along the way aborts the whole flow with the mapped
/// [`DiscoveryAbort`]. An empty result is reported as
/// [`DiscoveryAbort::NoDevicesFound`].
#[tracing::instrument(level = "debug", skip_all)]
pub async fn discover_candidates(
    adapter: &Adapter,
    client: &HumigadgetClient,
    known_addresses: &HashSet<String>,
    options: &ScanOptions,
) -> std::result::Result<Vec<DiscoveredCandidate>, DiscoveryAbort> {
    let peripherals = scan_peripherals(adapter, options)
        .await
        .map_err(|e| DiscoveryAbort::from_error(&e))?;

    let mut seen = Vec::new();
    for peripheral in peripherals {
        let properties = match peripheral.properties().await {
            Ok(Some(properties)) => properties,
            Ok(None) => continue,
            Err(e) => return Err(DiscoveryAbort::from_error(&e.into())),
        };
        let address = properties.address.to_string();
        let handle = DeviceHandle {
            adapter: adapter.clone(),
            peripheral,
            address: address.clone(),
            advertised_name: properties.local_name.clone(),
        };
        seen.push((
            handle,
            SeenAdvertisement {
                address,
                local_name: properties.local_name,
                rssi: properties.rssi,
            },
        ));
    }

    collect_candidates(seen, known_addresses, |handle| async move {
        client.initialize(&handle).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::populate_device_info;
    use crate::error::ConnectionFailureReason;
    use crate::mock::MockGatt;
    use humigadget_types::DEVICE_NAME;

    fn advert(address: &str, name: Option<&str>) -> ((), SeenAdvertisement) {
        (
            (),
            SeenAdvertisement {
                address: address.to_string(),
                local_name: name.map(str::to_string),
                rssi: Some(-60),
            },
        )
    }

    async fn initialize_from_mock(_: ()) -> Result<HumigadgetDevice> {
        let mock = MockGatt::humigadget();
        let mut device = HumigadgetDevice::new();
        device.name = DEVICE_NAME.to_string();
        populate_device_info(&mock, &mut device).await;
        Ok(device)
    }

    #[test]
    fn test_name_prefix_filter() {
        assert!(is_humigadget_name("Smart Humigadget"));
        assert!(is_humigadget_name("Smart Humigadget A1B2"));
        assert!(is_humigadget_name("Smart Humigadget Pro"));
        assert!(!is_humigadget_name("SmartHygrometer"));
        assert!(!is_humigadget_name("smart humigadget"));
        assert!(!is_humigadget_name("LYWSD03MMC"));
        assert!(!is_humigadget_name(""));
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("aa:bb:cc:dd:ee:ff"), "AABBCCDDEEFF");
        assert_eq!(normalize_address("AA-BB-CC-DD-EE-FF"), "AABBCCDDEEFF");
        assert_eq!(
            normalize_address("AA:BB:CC:DD:EE:FF"),
            normalize_address("aa-bb-cc-dd-ee-ff")
        );
    }

    #[test]
    fn test_scan_options_default() {
        let options = ScanOptions::default();
        assert_eq!(options.duration, Duration::from_secs(5));

        let options = ScanOptions::new().duration(Duration::from_secs(10));
        assert_eq!(options.duration, Duration::from_secs(10));
    }

    #[test]
    fn test_abort_reason_codes() {
        assert_eq!(
            DiscoveryAbort::NoDevicesFound.reason_code(),
            "no_devices_found"
        );
        assert_eq!(DiscoveryAbort::CannotConnect.reason_code(), "cannot_connect");
        assert_eq!(DiscoveryAbort::Unknown.reason_code(), "unknown");
        assert_eq!(DiscoveryAbort::CannotConnect.to_string(), "cannot_connect");
    }

    #[tokio::test]
    async fn test_collect_candidates_none_survive() {
        // Nameless and wrong-prefix advertisements never reach interrogation.
        let seen = vec![
            advert("11:11:11:11:11:11", None),
            advert("22:22:22:22:22:22", Some("SmartHygrometer")),
        ];
        let result = collect_candidates(seen, &HashSet::new(), initialize_from_mock).await;
        assert_eq!(result.unwrap_err(), DiscoveryAbort::NoDevicesFound);
    }

    #[tokio::test]
    async fn test_collect_candidates_skips_configured_addresses() {
        let seen = vec![advert("AA:BB:CC:DD:EE:FF", Some("Smart Humigadget"))];
        let known: HashSet<String> = ["aa-bb-cc-dd-ee-ff".to_string()].into();

        let result = collect_candidates(seen, &known, initialize_from_mock).await;
        assert_eq!(result.unwrap_err(), DiscoveryAbort::NoDevicesFound);
    }

    #[tokio::test]
    async fn test_collect_candidates_interrogation_failure_aborts() {
        let seen = vec![
            advert("AA:BB:CC:DD:EE:FF", Some("Smart Humigadget")),
            advert("11:22:33:44:55:66", Some("Smart Humigadget Pro")),
        ];
        let result = collect_candidates(seen, &HashSet::new(), |_| async {
            Err(Error::NotConnected)
        })
        .await;
        assert_eq!(result.unwrap_err(), DiscoveryAbort::CannotConnect);

        let seen = vec![advert("AA:BB:CC:DD:EE:FF", Some("Smart Humigadget"))];
        let result = collect_candidates(seen, &HashSet::new(), |_| async {
            Err(Error::Parse(humigadget_types::ParseError::EmptyPayload))
        })
        .await;
        assert_eq!(result.unwrap_err(), DiscoveryAbort::Unknown);
    }

    #[tokio::test]
    async fn test_collect_candidates_success() {
        let seen = vec![
            advert("AA:BB:CC:DD:EE:FF", Some("Smart Humigadget")),
            advert("11:11:11:11:11:11", None),
        ];
        let candidates = collect_candidates(seen, &HashSet::new(), initialize_from_mock)
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(candidate.name, DEVICE_NAME);
        assert_eq!(candidate.advertised_name.as_deref(), Some("Smart Humigadget"));
        assert_eq!(candidate.rssi, Some(-60));
        assert_eq!(candidate.device.identifier, "deadbeef00112233");
        assert_eq!(candidate.device.manufacturer, "Sensirion AG");
    }

    #[test]
    fn test_abort_from_error_mapping() {
        let transport = [
            Error::NotConnected,
            Error::device_not_found("AA:BB:CC:DD:EE:FF"),
            Error::timeout("connect to device", Duration::from_secs(15)),
            Error::connection_failed(None, ConnectionFailureReason::OutOfRange),
        ];
        for error in &transport {
            assert_eq!(
                DiscoveryAbort::from_error(error),
                DiscoveryAbort::CannotConnect,
                "{error} should map to cannot_connect"
            );
        }

        let unexpected = Error::Parse(humigadget_types::ParseError::EmptyPayload);
        assert_eq!(
            DiscoveryAbort::from_error(&unexpected),
            DiscoveryAbort::Unknown
        );
        let unexpected = Error::update_failed("poll failed");
        assert_eq!(
            DiscoveryAbort::from_error(&unexpected),
            DiscoveryAbort::Unknown
        );
    }
}
