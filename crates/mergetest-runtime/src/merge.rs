//! Merge bridge: the system under test of a loopback run
//!
//! Frames transmitted on each input port are forwarded, through that link's
//! impairment, to the ingress of a single output port.

use mergetest_core::{HarnessResult, PortId};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::{Frame, Impairment, LinkImpairer, PortFabric};

/// Which ports a bridge merges and how each link misbehaves
#[derive(Clone, Debug, PartialEq)]
pub struct MergeSpec {
    pub inputs: Vec<(PortId, Impairment)>,
    pub output: PortId,
    pub seed: u64,
}

impl MergeSpec {
    pub fn new(output: PortId) -> Self {
        MergeSpec {
            inputs: Vec::new(),
            output,
            seed: 0,
        }
    }

    /// Add an input port
    pub fn input(mut self, port: PortId, impairment: Impairment) -> Self {
        self.inputs.push((port, impairment));
        self
    }

    /// Set impairment seed; link `i` uses `seed + i`
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

struct MergeLink {
    input: PortId,
    rx: mpsc::Receiver<Frame>,
    tx: mpsc::Sender<Frame>,
    impairer: LinkImpairer,
}

/// A merge bridge with its channels claimed from the fabric
pub struct MergeBridge {
    output: PortId,
    links: Vec<MergeLink>,
}

impl MergeBridge {
    /// Claim the input egress consumers and the output ingress producer
    pub fn wire(spec: &MergeSpec, fabric: &PortFabric) -> HarnessResult<Self> {
        let tx = fabric.ingress_sender(spec.output)?;
        let links = spec
            .inputs
            .iter()
            .enumerate()
            .map(|(i, &(input, impairment))| {
                Ok(MergeLink {
                    input,
                    rx: fabric.take_egress(input)?,
                    tx: tx.clone(),
                    impairer: LinkImpairer::with_seed(impairment, spec.seed.wrapping_add(i as u64)),
                })
            })
            .collect::<HarnessResult<Vec<_>>>()?;

        Ok(MergeBridge {
            output: spec.output,
            links,
        })
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// One forwarding lane per input
    pub fn spawn_into(self, lanes: &mut JoinSet<HarnessResult<()>>) {
        let output = self.output;
        for link in self.links {
            lanes.spawn(forward(link, output));
        }
    }
}

async fn forward(mut link: MergeLink, output: PortId) -> HarnessResult<()> {
    'frames: while let Some(frame) = link.rx.recv().await {
        for out in link.impairer.apply(frame) {
            if link.tx.send(out).await.is_err() {
                break 'frames;
            }
        }
    }

    let stats = link.impairer.stats();
    debug!(
        input = link.input,
        output,
        frames_in = stats.frames_in,
        forwarded = stats.forwarded,
        dropped = stats.dropped,
        corrupted = stats.corrupted,
        injected = stats.injected,
        "merge link closed"
    );
    Ok(())
}
