//! Error types for humigadget-core.
//!
//! This module defines all error types that can occur when communicating
//! with Smart Humigadget devices via Bluetooth Low Energy.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::Timeout`] | Retry | Transient BLE congestion |
//! | [`Error::Bluetooth`] | Retry | Often transient |
//! | [`Error::ConnectionFailed`] | Retry with backoff | Device may be busy |
//! | [`Error::Parse`] | Do not retry | Payload corruption, surfaces as a failed poll |
//! | [`Error::CharacteristicNotFound`] | Do not retry | Firmware incompatibility |
//! | [`Error::DeviceNotFound`] | Do not retry this cycle | Device out of range; setup retries later |
//!
//! A failed sensor read or decode during a poll cycle is *not* recovered
//! locally: it propagates out of the refresh operation and surfaces to the
//! coordinator as [`Error::UpdateFailed`], leaving the previous cached data
//! visible until the next successful poll.

use std::time::Duration;

use thiserror::Error;

use humigadget_types::ParseError;

/// Errors that can occur when communicating with Smart Humigadget devices.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Device not found during scan, connection, or entry setup.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted while not connected to device.
    #[error("Not connected to device")]
    NotConnected,

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Failed to decode a characteristic payload.
    #[error("Decode error: {0}")]
    Parse(#[from] ParseError),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Connection failed with specific reason.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The device identifier that failed to connect.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// An entry for this address already exists in the registry.
    #[error("Device {address} is already configured")]
    AlreadyConfigured {
        /// The duplicate device address.
        address: String,
    },

    /// A poll cycle failed; the cached data remains stale until the next
    /// successful refresh.
    #[error("Unable to fetch data: {message}")]
    UpdateFailed {
        /// Description of the underlying failure.
        message: String,
    },
}

/// Structured reasons for connection failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// Bluetooth adapter not available or powered off.
    AdapterUnavailable,
    /// Device is out of range.
    OutOfRange,
    /// Connection attempt timed out.
    Timeout,
    /// Generic BLE error.
    BleError(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterUnavailable => write!(f, "Bluetooth adapter unavailable"),
            Self::OutOfRange => write!(f, "device out of range"),
            Self::Timeout => write!(f, "connection timed out"),
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Reason why a device was not found.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// Device with the specified address not found.
    NotFound {
        /// The address that was searched for.
        address: String,
    },
    /// No resolvable handle at entry setup; the caller should retry setup
    /// later rather than fail permanently.
    NotReadyAtSetup {
        /// The configured address that could not be resolved.
        address: String,
    },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { address } => write!(f, "device '{}' not found", address),
            Self::NotReadyAtSetup { address } => write!(
                f,
                "could not find device with address {} at setup; retry later",
                address
            ),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific address.
    pub fn device_not_found(address: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            address: address.into(),
        })
    }

    /// Create a setup-time not-ready error for a configured address.
    pub fn not_ready(address: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotReadyAtSetup {
            address: address.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a connection failure with structured reason.
    pub fn connection_failed(device_id: Option<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { device_id, reason }
    }

    /// Create an update-failed error for a poll cycle.
    pub fn update_failed(message: impl Into<String>) -> Self {
        Self::UpdateFailed {
            message: message.into(),
        }
    }
}

/// Result type alias using humigadget-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
