//! Run configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{HarnessError, HarnessResult, PortId};

/// Size of the fingerprint carried at the start of every payload
pub const FINGERPRINT_SIZE: usize = 16;

/// Received-packet count that completes a run by default
pub const DEFAULT_TOTAL_PACKETS: u64 = 100_000_000;

/// Configuration of one test run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Minimum received/sent percentage (exclusive) to pass
    pub passed_limit: u64,
    /// Packets per second, applied to each generator
    pub speed: u64,
    /// Send port of generator A
    pub outport1: PortId,
    /// Send port of generator B
    pub outport2: PortId,
    /// Receive port of the verifier
    pub inport: PortId,
    /// Completion threshold on the received-packet count
    pub total_packets: u64,
    /// Payload bytes per generated packet
    pub payload_size: usize,
    /// Worker threads for the pipeline
    pub cores: usize,
    /// Deadline after which the run is forced to complete as timed out
    pub timeout: Option<Duration>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            passed_limit: 85,
            speed: 1000,
            outport1: 0,
            outport2: 1,
            inport: 0,
            total_packets: DEFAULT_TOTAL_PACKETS,
            payload_size: FINGERPRINT_SIZE,
            cores: 16,
            timeout: None,
        }
    }
}

impl HarnessConfig {
    /// Set the pass threshold
    pub fn with_passed_limit(mut self, limit: u64) -> Self {
        self.passed_limit = limit;
        self
    }

    /// Set generator speed
    pub fn with_speed(mut self, speed: u64) -> Self {
        self.speed = speed;
        self
    }

    /// Set send and receive ports
    pub fn with_ports(mut self, outport1: PortId, outport2: PortId, inport: PortId) -> Self {
        self.outport1 = outport1;
        self.outport2 = outport2;
        self.inport = inport;
        self
    }

    /// Set completion threshold
    pub fn with_total_packets(mut self, total: u64) -> Self {
        self.total_packets = total;
        self
    }

    /// Set payload size
    pub fn with_payload_size(mut self, size: usize) -> Self {
        self.payload_size = size;
        self
    }

    /// Set worker thread count
    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores;
        self
    }

    /// Set run deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reject values no run can be built from
    pub fn validate(&self) -> HarnessResult<()> {
        if self.passed_limit > 100 {
            return Err(HarnessError::Config(format!(
                "PASSED_LIMIT {} exceeds 100",
                self.passed_limit
            )));
        }
        if self.speed == 0 {
            return Err(HarnessError::Config("SPEED must be positive".into()));
        }
        if self.total_packets == 0 {
            return Err(HarnessError::Config(
                "total packet target must be positive".into(),
            ));
        }
        if self.payload_size < FINGERPRINT_SIZE {
            return Err(HarnessError::Config(format!(
                "payload size {} cannot hold a {}-byte fingerprint",
                self.payload_size, FINGERPRINT_SIZE
            )));
        }
        if self.cores == 0 {
            return Err(HarnessError::Config("core count must be positive".into()));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(HarnessError::Config("timeout must be positive".into()));
        }
        Ok(())
    }
}
