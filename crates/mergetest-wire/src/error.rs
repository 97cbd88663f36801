//! Error types for packet construction and parsing

use thiserror::Error;

/// Wire-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Frame too large: {size} > {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Unsupported ethertype: {0:#06x}")]
    UnsupportedEtherType(u16),

    #[error("Unsupported IP protocol: {0}")]
    UnsupportedProtocol(u8),

    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Transport headers not parsed")]
    NotParsed,
}

/// Result type for wire operations
pub type WireResult<T> = Result<T, WireError>;
