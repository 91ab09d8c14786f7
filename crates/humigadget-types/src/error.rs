//! Error types for data parsing in humigadget-types.

use thiserror::Error;

/// Errors that can occur when decoding raw characteristic payloads.
///
/// This error type is platform-agnostic and does not include BLE-specific
/// errors (those belong in humigadget-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Payload has the wrong number of bytes for the expected format.
    #[error("invalid payload length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Number of bytes the decoder requires.
        expected: usize,
        /// Number of bytes actually received.
        actual: usize,
    },

    /// Payload was empty where at least one byte was required.
    #[error("empty payload")]
    EmptyPayload,
}

/// Result type alias using humigadget-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
