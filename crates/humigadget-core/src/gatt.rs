//! Trait seam for UUID-addressed characteristic reads.
//!
//! The client logic in [`crate::client`] is written against this trait so
//! it can be exercised with [`crate::mock::MockGatt`] instead of radio
//! hardware.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// A connected GATT peer that can serve characteristic reads.
///
/// Implemented by [`crate::connection::Connection`] for real devices and by
/// [`crate::mock::MockGatt`] for tests.
#[async_trait]
pub trait GattReader: Send + Sync {
    /// Read the current value of a characteristic by UUID.
    async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>>;
}
