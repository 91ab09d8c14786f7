//! Explicit registry of configured device entries.
//!
//! All per-device state hangs off an [`EntryRegistry`] owned by the
//! embedding application. Nothing here is process-global: two registries
//! in one process manage disjoint sets of devices.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use btleplug::platform::Adapter;
use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::HumigadgetClient;
use crate::connection::ConnectionConfig;
use crate::coordinator::{DEFAULT_POLL_INTERVAL, PollCoordinator, UpdateFn};
use crate::error::{Error, Result};
use crate::scan::{self, DeviceHandle, ScanOptions};

/// Options for setting up one device entry.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Scan options used to resolve the configured address.
    pub scan: ScanOptions,
    /// Connection configuration for the device client.
    pub connection: ConnectionConfig,
    /// Interval between poll cycles.
    pub poll_interval: Duration,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            connection: ConnectionConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Address-keyed map of running coordinators.
///
/// Addresses compare equal across case and separator variants, so
/// "aa:bb:cc:dd:ee:ff" and "AA-BB-CC-DD-EE-FF" are the same entry.
#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: RwLock<HashMap<String, Arc<PollCoordinator>>>,
}

impl EntryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a coordinator under its device address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyConfigured`] if the address is taken.
    pub async fn insert(
        &self,
        address: &str,
        coordinator: Arc<PollCoordinator>,
    ) -> Result<()> {
        let key = scan::normalize_address(address);
        let mut entries = self.entries.write().await;
        if entries.contains_key(&key) {
            return Err(Error::AlreadyConfigured {
                address: address.to_string(),
            });
        }
        entries.insert(key, coordinator);
        Ok(())
    }

    /// Look up the coordinator for an address.
    pub async fn get(&self, address: &str) -> Option<Arc<PollCoordinator>> {
        self.entries
            .read()
            .await
            .get(&scan::normalize_address(address))
            .cloned()
    }

    /// Whether an entry exists for this address.
    pub async fn contains(&self, address: &str) -> bool {
        self.entries
            .read()
            .await
            .contains_key(&scan::normalize_address(address))
    }

    /// The normalized addresses of all registered entries.
    pub async fn addresses(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Number of registered entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the registry has no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove an entry and stop its poll loop.
    pub async fn remove(&self, address: &str) -> Option<Arc<PollCoordinator>> {
        let removed = self
            .entries
            .write()
            .await
            .remove(&scan::normalize_address(address));
        if let Some(coordinator) = &removed {
            coordinator.shutdown();
        }
        removed
    }
}

fn make_update_fn(client: HumigadgetClient, handle: DeviceHandle) -> UpdateFn {
    Box::new(move |device| {
        let client = client.clone();
        let handle = handle.clone();
        async move { client.refresh(&handle, Some(device)).await.map(|_| ()) }.boxed()
    })
}

/// Set up one device entry: resolve, initialize, poll once, start polling.
///
/// The first poll cycle runs inline so a successful return means live
/// data is cached. A device that cannot be seen on the air reports
/// [`Error::DeviceNotFound`] with a retry-later reason rather than a
/// permanent failure.
#[tracing::instrument(level = "debug", skip_all, fields(address = %address))]
pub async fn setup_entry(
    registry: &EntryRegistry,
    adapter: &Adapter,
    address: &str,
    options: SetupOptions,
) -> Result<Arc<PollCoordinator>> {
    if registry.contains(address).await {
        return Err(Error::AlreadyConfigured {
            address: address.to_string(),
        });
    }

    let handle = scan::resolve_handle(adapter, address, &options.scan)
        .await?
        .ok_or_else(|| Error::not_ready(address))?;

    let client = HumigadgetClient::new(options.connection);
    let device = client.initialize(&handle).await?;
    debug!(identifier = %device.identifier, "Device initialized");

    let coordinator = PollCoordinator::new(
        format!("humigadget {}", address),
        device,
        options.poll_interval,
        make_update_fn(client, handle),
    );

    coordinator.refresh().await?;
    coordinator.spawn();

    if let Err(e) = registry.insert(address, Arc::clone(&coordinator)).await {
        coordinator.shutdown();
        return Err(e);
    }

    info!("Entry set up, polling every {:?}", options.poll_interval);
    Ok(coordinator)
}

/// Tear down one device entry, stopping its poll loop.
///
/// Returns `true` if an entry existed for the address.
pub async fn unload_entry(registry: &EntryRegistry, address: &str) -> bool {
    match registry.remove(address).await {
        Some(_) => {
            info!(address = %address, "Entry unloaded");
            true
        }
        None => false,
    }
}
