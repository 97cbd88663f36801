//! In-process loopback pipeline
//!
//! Each flow becomes one tokio lane. Generator flows are paced; receiver
//! flows drain a port's ingress. Sends go to a port's egress, and optional
//! merge bridges carry egress traffic back to ingress.

use std::sync::Arc;

use mergetest_core::{GenerateStage, HandleStage, HarnessError, HarnessResult, PortId};
use mergetest_wire::Packet;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::{
    FlowId, Frame, MergeBridge, MergeSpec, Pacer, Pipeline, PipelineHandle, PortFabric, PACER_TICK,
};

enum Source {
    Generator {
        stage: Arc<dyn GenerateStage>,
        rate: u64,
    },
    Receiver {
        port: PortId,
        rx: mpsc::Receiver<Frame>,
    },
}

enum Sink {
    Send {
        port: PortId,
        tx: mpsc::Sender<Frame>,
    },
    Stop,
}

struct Flow {
    source: Source,
    handlers: Vec<Arc<dyn HandleStage>>,
    sink: Option<Sink>,
}

/// Pipeline whose ports are channels of a [`PortFabric`]
pub struct LoopbackPipeline {
    fabric: Arc<PortFabric>,
    flows: Vec<Flow>,
    bridges: Vec<MergeBridge>,
}

impl LoopbackPipeline {
    pub fn new(fabric: Arc<PortFabric>) -> Self {
        LoopbackPipeline {
            fabric,
            flows: Vec::new(),
            bridges: Vec::new(),
        }
    }

    pub fn fabric(&self) -> &Arc<PortFabric> {
        &self.fabric
    }

    /// Add a merge bridge, claiming its ports now
    pub fn add_merge(&mut self, spec: &MergeSpec) -> HarnessResult<()> {
        let bridge = MergeBridge::wire(spec, &self.fabric)?;
        self.bridges.push(bridge);
        Ok(())
    }

    fn open_flow(&mut self, flow: FlowId) -> HarnessResult<&mut Flow> {
        let entry = self
            .flows
            .get_mut(flow)
            .ok_or(HarnessError::UnknownFlow(flow))?;
        if entry.sink.is_some() {
            return Err(HarnessError::Pipeline(format!("flow {} already closed", flow)));
        }
        Ok(entry)
    }

    fn push_flow(&mut self, source: Source) -> FlowId {
        self.flows.push(Flow {
            source,
            handlers: Vec::new(),
            sink: None,
        });
        self.flows.len() - 1
    }
}

impl Pipeline for LoopbackPipeline {
    fn set_generator(
        &mut self,
        stage: Arc<dyn GenerateStage>,
        rate: u64,
    ) -> HarnessResult<FlowId> {
        if rate == 0 {
            return Err(HarnessError::Config("generator rate must be positive".into()));
        }
        Ok(self.push_flow(Source::Generator { stage, rate }))
    }

    fn set_sender(&mut self, flow: FlowId, port: PortId) -> HarnessResult<()> {
        let tx = self.fabric.egress_sender(port)?;
        self.open_flow(flow)?.sink = Some(Sink::Send { port, tx });
        Ok(())
    }

    fn set_receiver(&mut self, port: PortId) -> HarnessResult<FlowId> {
        let rx = self.fabric.take_ingress(port)?;
        Ok(self.push_flow(Source::Receiver { port, rx }))
    }

    fn set_handler(&mut self, flow: FlowId, stage: Arc<dyn HandleStage>) -> HarnessResult<()> {
        self.open_flow(flow)?.handlers.push(stage);
        Ok(())
    }

    fn set_stopper(&mut self, flow: FlowId) -> HarnessResult<()> {
        self.open_flow(flow)?.sink = Some(Sink::Stop);
        Ok(())
    }

    fn start(self) -> HarnessResult<PipelineHandle> {
        if let Some(open) = self.flows.iter().position(|f| f.sink.is_none()) {
            return Err(HarnessError::Pipeline(format!(
                "flow {} has no sender or stopper",
                open
            )));
        }

        let mut lanes = JoinSet::new();
        let flow_count = self.flows.len();
        let bridge_count = self.bridges.len();

        for (id, flow) in self.flows.into_iter().enumerate() {
            let Flow {
                source,
                handlers,
                sink,
            } = flow;
            let sink = sink.unwrap_or(Sink::Stop);
            match source {
                Source::Generator { stage, rate } => {
                    lanes.spawn(generator_lane(id, stage, rate, handlers, sink));
                }
                Source::Receiver { port, rx } => {
                    lanes.spawn(receiver_lane(id, port, rx, handlers, sink));
                }
            }
        }
        for bridge in self.bridges {
            bridge.spawn_into(&mut lanes);
        }

        info!(
            flows = flow_count,
            bridges = bridge_count,
            lanes = lanes.len(),
            "loopback pipeline started"
        );
        Ok(PipelineHandle::new(lanes))
    }
}

/// Run handlers and deliver. Returns false once the sink is gone.
async fn dispatch(mut packet: Packet, handlers: &[Arc<dyn HandleStage>], sink: &Sink) -> bool {
    for handler in handlers {
        handler.handle(&mut packet);
    }
    match sink {
        Sink::Send { tx, .. } => tx.send(packet.into_frame()).await.is_ok(),
        Sink::Stop => true,
    }
}

async fn generator_lane(
    id: FlowId,
    stage: Arc<dyn GenerateStage>,
    rate: u64,
    handlers: Vec<Arc<dyn HandleStage>>,
    sink: Sink,
) -> HarnessResult<()> {
    let mut ticker = time::interval(PACER_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pacer = Pacer::new(rate);

    debug!(flow = id, rate, "generator lane running");
    loop {
        ticker.tick().await;
        for _ in 0..pacer.due(Instant::now()) {
            let packet = stage.generate()?;
            if !dispatch(packet, &handlers, &sink).await {
                debug!(flow = id, released = pacer.released(), "generator sink closed");
                return Ok(());
            }
        }
    }
}

async fn receiver_lane(
    id: FlowId,
    port: PortId,
    mut rx: mpsc::Receiver<Frame>,
    handlers: Vec<Arc<dyn HandleStage>>,
    sink: Sink,
) -> HarnessResult<()> {
    debug!(flow = id, port, "receiver lane running");
    while let Some(frame) = rx.recv().await {
        if !dispatch(Packet::from_bytes(frame), &handlers, &sink).await {
            break;
        }
    }
    debug!(flow = id, port, "receiver lane closed");
    Ok(())
}

impl std::fmt::Debug for LoopbackPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackPipeline")
            .field("ports", &self.fabric.port_count())
            .field("flows", &self.flows.len())
            .field("bridges", &self.bridges.len())
            .finish()
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::Send { port, .. } => write!(f, "Send({})", port),
            Sink::Stop => f.write_str("Stop"),
        }
    }
}
