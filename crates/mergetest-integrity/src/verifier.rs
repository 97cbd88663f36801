//! Receive-side integrity verification

use std::net::Ipv4Addr;
use std::sync::Arc;

use mergetest_core::{CompletionCause, CompletionSignal, CounterSet, GroupId, HandleStage};
use mergetest_wire::Packet;
use tracing::{debug, info, warn};

use crate::fingerprint;

/// Outcome of verifying one arrival
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Headers could not be parsed or carry no fingerprint: traffic this
    /// harness did not produce
    Foreign,
    /// Fingerprint mismatch
    Broken,
    /// Intact packet of a known group
    Intact(GroupId),
    /// Intact digest but a source address of neither group
    Unrecognized(Ipv4Addr),
}

/// Verifier stage for the receive lane.
///
/// Owns every receive-side counter. Each arrival is counted in
/// `received_total` before anything else, so the total always equals the
/// number of completed invocations.
#[derive(Debug, Clone)]
pub struct IntegrityVerifier {
    counters: Arc<CounterSet>,
    completion: Arc<CompletionSignal>,
    target: u64,
}

impl IntegrityVerifier {
    pub fn new(counters: Arc<CounterSet>, completion: Arc<CompletionSignal>, target: u64) -> Self {
        IntegrityVerifier {
            counters,
            completion,
            target,
        }
    }

    /// Count, classify and record one arrival, firing completion once the
    /// received total reaches the target
    pub fn verify(&self, packet: &mut Packet) -> Classification {
        let total = self.counters.record_arrival();

        let class = self.classify(packet);
        match class {
            Classification::Foreign => {}
            Classification::Broken => self.counters.record_broken(),
            Classification::Intact(group) => self.counters.record_received(group),
            Classification::Unrecognized(addr) => {
                warn!(%addr, "intact packet with source address of neither group");
            }
        }

        if total >= self.target && self.completion.fire(CompletionCause::TargetReached) {
            info!(total, target = self.target, "packet target reached");
        }

        class
    }

    fn classify(&self, packet: &mut Packet) -> Classification {
        if let Err(e) = packet.parse_l4() {
            debug!(error = %e, "skipping unparsable packet");
            return Classification::Foreign;
        }

        match fingerprint::verify(packet) {
            Ok(true) => {}
            Ok(false) => return Classification::Broken,
            Err(e) => {
                debug!(error = %e, "packet carries no fingerprint");
                return Classification::Foreign;
            }
        }

        match packet.ipv4_src() {
            Ok(addr) => GroupId::from_addr(addr)
                .map(Classification::Intact)
                .unwrap_or(Classification::Unrecognized(addr)),
            Err(_) => Classification::Foreign,
        }
    }
}

impl HandleStage for IntegrityVerifier {
    fn handle(&self, packet: &mut Packet) {
        self.verify(packet);
    }
}
