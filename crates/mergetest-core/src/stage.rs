//! Stage bodies composed by a pipeline
//!
//! The harness only implements what happens to one packet; scheduling,
//! rates and port I/O belong to whoever runs the stages.

use mergetest_wire::Packet;

use crate::HarnessResult;

/// Index of a pipeline port
pub type PortId = u16;

/// Produces one packet per invocation
pub trait GenerateStage: Send + Sync + 'static {
    /// Build the next packet. An error is fatal for the run.
    fn generate(&self) -> HarnessResult<Packet>;
}

/// Inspects one received packet in place
pub trait HandleStage: Send + Sync + 'static {
    fn handle(&self, packet: &mut Packet);
}
