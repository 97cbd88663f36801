//! Link impairment for the loopback merge
//!
//! Lets a run exercise the verdict logic against a pipeline that loses,
//! damages or pollutes traffic:
//! - Packet loss
//! - Header corruption
//! - Foreign frame injection

use std::ops::Range;

use bytes::BytesMut;
use mergetest_wire::{EtherType, ETHER_HEADER_SIZE, ETHER_IPV4_UDP_HEADERS_SIZE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Frame;

/// Header byte ranges corruption may touch: MAC addresses, IPv4 addresses
/// and UDP ports. Damage there leaves the frame parsable, so it surfaces as
/// a fingerprint mismatch rather than as foreign traffic.
const CORRUPTIBLE_RANGES: [Range<usize>; 3] = [0..12, 26..34, 34..38];

/// Per-link impairment rates (each 0.0 - 1.0)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Impairment {
    /// Probability a frame is dropped
    pub loss_rate: f64,
    /// Probability a forwarded frame gets one header bit flipped
    pub corrupt_rate: f64,
    /// Probability a foreign frame is injected after a forwarded one
    pub foreign_rate: f64,
}

impl Impairment {
    /// Perfect link
    pub fn none() -> Self {
        Self::default()
    }

    /// Set loss rate
    pub fn with_loss(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set corruption rate
    pub fn with_corruption(mut self, rate: f64) -> Self {
        self.corrupt_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set foreign injection rate
    pub fn with_foreign(mut self, rate: f64) -> Self {
        self.foreign_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn is_none(&self) -> bool {
        self.loss_rate == 0.0 && self.corrupt_rate == 0.0 && self.foreign_rate == 0.0
    }
}

/// What one link did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImpairmentStats {
    pub frames_in: u64,
    pub forwarded: u64,
    pub dropped: u64,
    pub corrupted: u64,
    pub injected: u64,
}

/// Seeded impairment applied to every frame crossing one link
pub struct LinkImpairer {
    config: Impairment,
    rng: StdRng,
    stats: ImpairmentStats,
}

impl LinkImpairer {
    pub fn with_seed(config: Impairment, seed: u64) -> Self {
        LinkImpairer {
            config,
            rng: StdRng::seed_from_u64(seed),
            stats: ImpairmentStats::default(),
        }
    }

    pub fn stats(&self) -> &ImpairmentStats {
        &self.stats
    }

    /// Frames to deliver for one input frame, in order
    pub fn apply(&mut self, mut frame: Frame) -> Vec<Frame> {
        self.stats.frames_in += 1;

        if self.config.is_none() {
            self.stats.forwarded += 1;
            return vec![frame];
        }

        if self.rng.gen_bool(self.config.loss_rate) {
            self.stats.dropped += 1;
            return Vec::new();
        }

        if self.rng.gen_bool(self.config.corrupt_rate) && self.corrupt(&mut frame) {
            self.stats.corrupted += 1;
        }

        let mut out = vec![frame];
        self.stats.forwarded += 1;

        if self.rng.gen_bool(self.config.foreign_rate) {
            out.push(foreign_frame());
            self.stats.injected += 1;
        }
        out
    }

    fn corrupt(&mut self, frame: &mut Frame) -> bool {
        let range = &CORRUPTIBLE_RANGES[self.rng.gen_range(0..CORRUPTIBLE_RANGES.len())];
        if frame.len() < range.end {
            return false;
        }
        let byte = self.rng.gen_range(range.clone());
        let bit = self.rng.gen_range(0..8u8);
        frame[byte] ^= 1 << bit;
        true
    }
}

/// A frame no generator produces: an ARP-typed Ethernet frame
pub fn foreign_frame() -> Frame {
    let mut frame = BytesMut::zeroed(ETHER_IPV4_UDP_HEADERS_SIZE);
    frame[ETHER_HEADER_SIZE - 2..ETHER_HEADER_SIZE].copy_from_slice(&EtherType::Arp.to_be_bytes());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mergetest_core::{CompletionSignal, CounterSet, GenerateStage, GroupId};
    use mergetest_integrity::{Classification, GroupGenerator, IntegrityVerifier};
    use mergetest_wire::Packet;

    fn frame() -> Frame {
        GroupGenerator::new(GroupId::A, 16, Arc::new(CounterSet::new()))
            .generate()
            .unwrap()
            .into_frame()
    }

    fn classify(frame: Frame) -> Classification {
        let verifier = IntegrityVerifier::new(
            Arc::new(CounterSet::new()),
            Arc::new(CompletionSignal::new()),
            u64::MAX,
        );
        verifier.verify(&mut Packet::from_bytes(frame))
    }

    #[test]
    fn test_perfect_link_forwards_untouched() {
        let mut link = LinkImpairer::with_seed(Impairment::none(), 1);
        let original = frame();

        let out = link.apply(original.clone());
        assert_eq!(out, vec![original]);
        assert_eq!(link.stats().forwarded, 1);
    }

    #[test]
    fn test_full_loss_drops_everything() {
        let mut link = LinkImpairer::with_seed(Impairment::none().with_loss(1.0), 1);
        for _ in 0..100 {
            assert!(link.apply(frame()).is_empty());
        }
        assert_eq!(link.stats().dropped, 100);
        assert_eq!(link.stats().forwarded, 0);
    }

    #[test]
    fn test_loss_rate_is_roughly_honoured() {
        let mut link = LinkImpairer::with_seed(Impairment::none().with_loss(0.25), 42);
        for _ in 0..10_000 {
            link.apply(frame());
        }
        let dropped = link.stats().dropped;
        assert!((2_000..3_000).contains(&dropped), "dropped {}", dropped);
    }

    #[test]
    fn test_corruption_is_detected_as_broken() {
        let mut link = LinkImpairer::with_seed(Impairment::none().with_corruption(1.0), 7);
        for _ in 0..200 {
            let out = link.apply(frame());
            assert_eq!(out.len(), 1);
            assert_eq!(
                classify(out.into_iter().next().unwrap()),
                Classification::Broken
            );
        }
        assert_eq!(link.stats().corrupted, 200);
    }

    #[test]
    fn test_injected_frames_are_foreign() {
        let mut link = LinkImpairer::with_seed(Impairment::none().with_foreign(1.0), 3);
        let out = link.apply(frame());

        assert_eq!(out.len(), 2);
        assert_eq!(classify(out[0].clone()), Classification::Intact(GroupId::A));
        assert_eq!(classify(out[1].clone()), Classification::Foreign);
        assert_eq!(link.stats().injected, 1);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let config = Impairment::none().with_loss(0.3).with_corruption(0.3);
        let mut first = LinkImpairer::with_seed(config, 99);
        let mut second = LinkImpairer::with_seed(config, 99);

        for _ in 0..500 {
            assert_eq!(first.apply(frame()), second.apply(frame()));
        }
    }

    #[test]
    fn test_rates_are_clamped() {
        let config = Impairment::none().with_loss(2.0).with_corruption(-1.0);
        assert_eq!(config.loss_rate, 1.0);
        assert_eq!(config.corrupt_rate, 0.0);
    }
}
