//! Pipeline interface consumed by the harness

use std::sync::Arc;

use mergetest_core::{GenerateStage, HandleStage, HarnessError, HarnessResult, PortId};
use tokio::task::JoinSet;
use tracing::debug;

/// Handle to a flow registered on a pipeline
pub type FlowId = usize;

/// A packet-processing pipeline the harness composes its stages onto.
///
/// Flows start at a generator or a receiver, pass through any handlers and
/// must end at a sender or a stopper before the pipeline starts.
pub trait Pipeline {
    /// New flow producing `rate` packets per second from `stage`
    fn set_generator(&mut self, stage: Arc<dyn GenerateStage>, rate: u64)
        -> HarnessResult<FlowId>;

    /// Terminate `flow` by transmitting on `port`
    fn set_sender(&mut self, flow: FlowId, port: PortId) -> HarnessResult<()>;

    /// New flow of packets arriving on `port`
    fn set_receiver(&mut self, port: PortId) -> HarnessResult<FlowId>;

    /// Run `stage` on every packet of `flow`
    fn set_handler(&mut self, flow: FlowId, stage: Arc<dyn HandleStage>) -> HarnessResult<()>;

    /// Terminate `flow` by dropping its packets
    fn set_stopper(&mut self, flow: FlowId) -> HarnessResult<()>;

    /// Launch every lane and return without waiting for them. Must be called
    /// from within a tokio runtime.
    fn start(self) -> HarnessResult<PipelineHandle>;
}

/// Running lanes of a started pipeline
pub struct PipelineHandle {
    lanes: JoinSet<HarnessResult<()>>,
}

impl PipelineHandle {
    pub fn new(lanes: JoinSet<HarnessResult<()>>) -> Self {
        PipelineHandle { lanes }
    }

    /// Number of lanes still tracked
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Resolve with the first lane error. Lanes that finish cleanly are
    /// skipped; if all of them do, this never resolves.
    ///
    /// Cancel safe.
    pub async fn failure(&mut self) -> HarnessError {
        while let Some(joined) = self.lanes.join_next().await {
            match joined {
                Ok(Ok(())) => debug!("pipeline lane finished"),
                Ok(Err(e)) => return e,
                Err(e) if e.is_panic() => {
                    return HarnessError::Pipeline(format!("lane panicked: {}", e))
                }
                Err(_) => {}
            }
        }
        std::future::pending().await
    }

    /// Abort every lane and wait for them to unwind
    pub async fn shutdown(mut self) {
        self.lanes.abort_all();
        while self.lanes.join_next().await.is_some() {}
    }
}
