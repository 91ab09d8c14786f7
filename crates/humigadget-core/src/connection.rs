//! BLE connection establishment and characteristic access.
//!
//! A [`Connection`] lives for exactly one client operation: connect, read
//! the needed characteristics, disconnect. No connection is held open
//! across operations. [`ConnectionGuard`] guarantees the disconnect on
//! every exit path, including a read failure partway through.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use tokio::runtime::Handle;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::gatt::GattReader;
use crate::retry::{RetryConfig, with_retry};
use crate::scan::DeviceHandle;

/// Default timeout for establishing a BLE connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for BLE characteristic read operations.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for BLE connection timeouts and retry behavior.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use humigadget_core::connection::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connect_timeout(Duration::from_secs(20))
///     .read_timeout(Duration::from_secs(15));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection (per attempt).
    pub connect_timeout: Duration,
    /// Timeout for BLE read operations.
    pub read_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// Retry policy for the connect step.
    pub retry: RetryConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            retry: RetryConfig::for_connect(),
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the connect retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// An established connection to one physical Smart Humigadget.
///
/// # Cleanup
///
/// Call [`Connection::disconnect`] (or go through [`ConnectionGuard`])
/// before dropping. A `Connection` dropped while still connected logs a
/// warning and attempts a best-effort disconnect in the background.
pub struct Connection {
    /// Kept alive for the lifetime of the peripheral connection; the
    /// peripheral may hold internal references to the adapter.
    #[allow(dead_code)]
    adapter: Adapter,
    /// The underlying BLE peripheral.
    peripheral: Peripheral,
    /// Device address or platform identifier.
    address: String,
    /// UUID -> characteristic lookup built after service discovery.
    characteristics: HashMap<Uuid, Characteristic>,
    /// Whether disconnect has been called (for Drop warning).
    disconnected: AtomicBool,
    /// Connection configuration (timeouts, retry).
    config: ConnectionConfig,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("characteristics", &self.characteristics.len())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect to the device behind `handle` and discover its services.
    ///
    /// The connect step is retried per [`ConnectionConfig::retry`]; every
    /// attempt is bounded by [`ConnectionConfig::connect_timeout`].
    #[tracing::instrument(level = "debug", skip_all, fields(address = %handle.address()))]
    pub async fn establish(handle: &DeviceHandle, config: &ConnectionConfig) -> Result<Self> {
        let peripheral = handle.peripheral().clone();
        let address = handle.address().to_string();

        with_retry(&config.retry, "connect", || async {
            timeout(config.connect_timeout, peripheral.connect())
                .await
                .map_err(|_| Error::timeout("connect to device", config.connect_timeout))?
                .map_err(Error::from)
        })
        .await?;
        debug!("Connected");

        timeout(config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", config.discovery_timeout))??;

        let services = peripheral.services();
        let mut characteristics = HashMap::new();
        for service in &services {
            for characteristic in &service.characteristics {
                characteristics.insert(characteristic.uuid, characteristic.clone());
            }
        }
        debug!(
            "Discovered {} services, cached {} characteristics",
            services.len(),
            characteristics.len()
        );

        Ok(Self {
            adapter: handle.adapter().clone(),
            peripheral,
            address,
            characteristics,
            disconnected: AtomicBool::new(false),
            config: config.clone(),
        })
    }

    /// Get the device address or identifier.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Check if the device is connected (queries BLE stack state).
    pub async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    fn find_characteristic(&self, uuid: Uuid) -> Result<&Characteristic> {
        self.characteristics.get(&uuid).ok_or_else(|| {
            Error::characteristic_not_found(uuid.to_string(), self.peripheral.services().len())
        })
    }

    /// Read a characteristic value by UUID.
    ///
    /// Bounded by [`ConnectionConfig::read_timeout`] to prevent indefinite
    /// hangs on BLE operations.
    pub async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>> {
        let characteristic = self.find_characteristic(uuid)?;
        let data = timeout(self.config.read_timeout, self.peripheral.read(characteristic))
            .await
            .map_err(|_| {
                Error::timeout(
                    format!("read characteristic {}", uuid),
                    self.config.read_timeout,
                )
            })??;
        Ok(data)
    }

    /// Disconnect from the device.
    #[tracing::instrument(level = "debug", skip(self), fields(address = %self.address))]
    pub async fn disconnect(&self) -> Result<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        self.peripheral.disconnect().await?;
        debug!("Disconnected");
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.disconnected.load(Ordering::SeqCst) {
            self.disconnected.store(true, Ordering::SeqCst);

            warn!(
                address = %self.address,
                "Connection dropped without disconnect, performing best-effort cleanup"
            );

            let peripheral = self.peripheral.clone();
            let address = self.address.clone();
            if let Ok(handle) = Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = peripheral.disconnect().await {
                        debug!(
                            address = %address,
                            error = %e,
                            "Best-effort disconnect failed (device may already be disconnected)"
                        );
                    }
                });
            }
        }
    }
}

#[async_trait]
impl GattReader for Connection {
    async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>> {
        Connection::read_characteristic(self, uuid).await
    }
}

/// Scoped ownership of a [`Connection`] that guarantees a disconnect
/// attempt on every exit path.
///
/// The happy path calls [`ConnectionGuard::close`] to disconnect and
/// surface any disconnect error; early returns and panics fall back to a
/// best-effort background disconnect in `Drop`.
pub struct ConnectionGuard {
    connection: Option<Connection>,
}

impl ConnectionGuard {
    /// Wrap an established connection.
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: Some(connection),
        }
    }

    /// Disconnect explicitly, consuming the guard.
    pub async fn close(mut self) -> Result<()> {
        match self.connection.take() {
            Some(connection) => connection.disconnect().await,
            None => Ok(()),
        }
    }
}

impl Deref for ConnectionGuard {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref().expect("connection already taken")
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Ok(handle) = Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = connection.disconnect().await {
                        warn!(error = %e, "Failed to disconnect device in guard drop");
                    }
                });
            } else {
                warn!("No tokio runtime available for disconnect in guard drop");
            }
        }
    }
}
