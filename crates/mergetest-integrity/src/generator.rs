//! Rate-driven group generators

use std::sync::Arc;

use mergetest_core::{CounterSet, GenerateStage, GroupId, HarnessError, HarnessResult};
use mergetest_wire::Packet;

use crate::fingerprint;

/// Generator stage for one traffic group.
///
/// Each invocation builds one packet, tags it with the group's identity and
/// fingerprint, then counts it in the group's own sent counter. Two
/// generators share nothing but the counter set.
#[derive(Debug, Clone)]
pub struct GroupGenerator {
    group: GroupId,
    payload_size: usize,
    counters: Arc<CounterSet>,
}

impl GroupGenerator {
    pub fn new(group: GroupId, payload_size: usize, counters: Arc<CounterSet>) -> Self {
        GroupGenerator {
            group,
            payload_size,
            counters,
        }
    }

    #[inline]
    pub fn group(&self) -> GroupId {
        self.group
    }
}

impl GenerateStage for GroupGenerator {
    fn generate(&self) -> HarnessResult<Packet> {
        let mut packet =
            Packet::empty_udp(self.payload_size).map_err(HarnessError::PacketAllocation)?;
        fingerprint::tag(&mut packet, self.group).map_err(HarnessError::PacketAllocation)?;

        self.counters.record_sent(self.group);
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mergetest_wire::MAX_FRAME_SIZE;

    #[test]
    fn test_generate_counts_own_group_only() {
        let counters = Arc::new(CounterSet::new());
        let gen_a = GroupGenerator::new(GroupId::A, 16, Arc::clone(&counters));

        for _ in 0..5 {
            let packet = gen_a.generate().unwrap();
            assert_eq!(packet.ipv4_src().unwrap(), GroupId::A.addr());
            assert!(fingerprint::verify(&packet).unwrap());
        }

        assert_eq!(counters.sent_count(GroupId::A), 5);
        assert_eq!(counters.sent_count(GroupId::B), 0);
    }

    #[test]
    fn test_generators_run_concurrently() {
        let counters = Arc::new(CounterSet::new());
        let generators = [
            GroupGenerator::new(GroupId::A, 16, Arc::clone(&counters)),
            GroupGenerator::new(GroupId::B, 16, Arc::clone(&counters)),
        ];

        std::thread::scope(|s| {
            for generator in &generators {
                for _ in 0..2 {
                    s.spawn(move || {
                        for _ in 0..1000 {
                            generator.generate().unwrap();
                        }
                    });
                }
            }
        });

        let snap = counters.snapshot();
        assert_eq!(snap.sent_a, 2000);
        assert_eq!(snap.sent_b, 2000);
    }

    #[test]
    fn test_allocation_failure_is_fatal_and_uncounted() {
        let counters = Arc::new(CounterSet::new());
        let generator = GroupGenerator::new(GroupId::B, MAX_FRAME_SIZE, Arc::clone(&counters));

        let result = generator.generate();
        assert!(matches!(result, Err(HarnessError::PacketAllocation(_))));
        assert_eq!(counters.sent_count(GroupId::B), 0);
    }
}
