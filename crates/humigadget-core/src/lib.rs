//! Core BLE library for the Sensirion SHT31 Smart Humigadget.
//!
//! This crate talks to the Smart Humigadget over Bluetooth Low Energy and
//! turns its readings into entities a home-automation frontend can show.
//!
//! # Features
//!
//! - **Device discovery**: Scan for nearby Smart Humigadget devices by
//!   their advertised name
//! - **Device identity**: Read the seven device-information
//!   characteristics, tolerating firmwares that omit some of them
//! - **Sensor polling**: Battery, humidity, and temperature on a fixed
//!   interval, with stale data kept across failed cycles
//! - **Guaranteed disconnect**: Every operation releases the connection
//!   on success and failure alike
//! - **Multi-device support**: An explicit registry of running entries,
//!   with no process-global state
//!
//! # Platform Differences
//!
//! Device identification varies by platform:
//!
//! - **macOS**: Devices are identified by a UUID assigned by
//!   CoreBluetooth, stable per device per machine but not a MAC address.
//! - **Linux/Windows**: Devices are identified by their Bluetooth MAC
//!   address (e.g. `AA:BB:CC:DD:EE:FF`).
//!
//! Configured addresses are compared case- and separator-insensitively,
//! so either spelling of a MAC resolves to the same entry.
//!
//! # Quick Start
//!
//! ```no_run
//! use humigadget_core::registry::{self, EntryRegistry, SetupOptions};
//! use humigadget_core::scan;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = scan::get_adapter().await?;
//!     let registry = EntryRegistry::new();
//!
//!     let coordinator = registry::setup_entry(
//!         &registry,
//!         &adapter,
//!         "AA:BB:CC:DD:EE:FF",
//!         SetupOptions::default(),
//!     )
//!     .await?;
//!
//!     let device = coordinator.data().await;
//!     println!("{}: {:?}", device.name, device.sensor("temperature"));
//!
//!     registry::unload_entry(&registry, "AA:BB:CC:DD:EE:FF").await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod connection;
pub mod coordinator;
pub mod entities;
pub mod error;
pub mod gatt;
pub mod mock;
pub mod registry;
pub mod retry;
pub mod scan;

// Core exports
pub use client::HumigadgetClient;
pub use connection::{Connection, ConnectionConfig, ConnectionGuard};
pub use coordinator::{DEFAULT_POLL_INTERVAL, PollCoordinator, UpdateFn};
pub use entities::{
    DeviceMetadata, SENSOR_DESCRIPTIONS, SensorEntity, SensorEntityDescription, build_entities,
};
pub use error::{ConnectionFailureReason, DeviceNotFoundReason, Error, Result};
pub use gatt::GattReader;
pub use mock::MockGatt;
pub use registry::{EntryRegistry, SetupOptions, setup_entry, unload_entry};
pub use retry::{RetryConfig, with_retry};
pub use scan::{
    DeviceHandle, DiscoveredCandidate, DiscoveryAbort, NAME_PREFIX, ScanOptions,
    discover_candidates, resolve_handle,
};

// Re-export from humigadget-types
pub use humigadget_types::uuids;
pub use humigadget_types::{HumigadgetDevice, InfoField, SensorValue};
