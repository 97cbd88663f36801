//! Error types for the merge stability harness

use mergetest_wire::WireError;
use thiserror::Error;

/// Errors that terminate a run
#[derive(Error, Debug)]
pub enum HarnessError {
    /// A generator could not construct its packet. Every generation attempt
    /// must succeed or the sent/received ratio is meaningless.
    #[error("Packet allocation failed: {0}")]
    PacketAllocation(WireError),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Unknown port: {0}")]
    UnknownPort(u16),

    #[error("Port {0} already claimed")]
    PortInUse(u16),

    #[error("Unknown flow: {0}")]
    UnknownFlow(usize),
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;
