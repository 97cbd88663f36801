//! Shared run counters
//!
//! One `CounterSet` is created per run and handed to every lane behind an
//! `Arc`. Each counter has a single writer role: generator A owns `sent_a`,
//! generator B owns `sent_b`, the verifier owns the receive side. All
//! updates are plain atomic increments; values only grow.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::GroupId;

/// Counters shared between generator and verifier lanes.
#[derive(Debug, Default)]
pub struct CounterSet {
    sent_a: AtomicU64,
    sent_b: AtomicU64,
    received_a: AtomicU64,
    received_b: AtomicU64,
    received_total: AtomicU64,
    broken: AtomicU64,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one packet emitted by `group`'s generator
    #[inline]
    pub fn record_sent(&self, group: GroupId) {
        self.sent(group).fetch_add(1, Ordering::Relaxed);
    }

    /// Count one arrival on the receive side, returning the new total.
    ///
    /// The returned value is unique per caller, which is what lets several
    /// verifier invocations race on the completion threshold safely.
    #[inline]
    pub fn record_arrival(&self) -> u64 {
        self.received_total.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count one intact packet of `group`
    #[inline]
    pub fn record_received(&self, group: GroupId) {
        self.received(group).fetch_add(1, Ordering::Relaxed);
    }

    /// Count one packet whose fingerprint did not match
    #[inline]
    pub fn record_broken(&self) {
        self.broken.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn sent_count(&self, group: GroupId) -> u64 {
        self.sent(group).load(Ordering::Relaxed)
    }

    #[inline]
    pub fn received_count(&self, group: GroupId) -> u64 {
        self.received(group).load(Ordering::Relaxed)
    }

    #[inline]
    pub fn received_total(&self) -> u64 {
        self.received_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn broken(&self) -> u64 {
        self.broken.load(Ordering::Relaxed)
    }

    /// Read every counter once
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            sent_a: self.sent_a.load(Ordering::Acquire),
            sent_b: self.sent_b.load(Ordering::Acquire),
            received_a: self.received_a.load(Ordering::Acquire),
            received_b: self.received_b.load(Ordering::Acquire),
            received_total: self.received_total.load(Ordering::Acquire),
            broken: self.broken.load(Ordering::Acquire),
        }
    }

    #[inline]
    fn sent(&self, group: GroupId) -> &AtomicU64 {
        match group {
            GroupId::A => &self.sent_a,
            GroupId::B => &self.sent_b,
        }
    }

    #[inline]
    fn received(&self, group: GroupId) -> &AtomicU64 {
        match group {
            GroupId::A => &self.received_a,
            GroupId::B => &self.received_b,
        }
    }
}

/// Plain copy of the counters taken at one point in time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub sent_a: u64,
    pub sent_b: u64,
    pub received_a: u64,
    pub received_b: u64,
    pub received_total: u64,
    pub broken: u64,
}

impl CounterSnapshot {
    #[inline]
    pub fn sent(&self) -> u64 {
        self.sent_a + self.sent_b
    }

    /// Intact packets of a known group
    #[inline]
    pub fn received(&self) -> u64 {
        self.received_a + self.received_b
    }

    /// Arrivals that were neither intact group members nor broken
    #[inline]
    pub fn unclassified(&self) -> u64 {
        self.received_total
            .saturating_sub(self.received() + self.broken)
    }

    pub fn sent_for(&self, group: GroupId) -> u64 {
        match group {
            GroupId::A => self.sent_a,
            GroupId::B => self.sent_b,
        }
    }

    pub fn received_for(&self, group: GroupId) -> u64 {
        match group {
            GroupId::A => self.received_a,
            GroupId::B => self.received_b,
        }
    }
}
