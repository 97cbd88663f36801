//! Traffic groups and their synthetic source addresses

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Source address stamped on group A packets
pub const GROUP_A_ADDR: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

/// Source address stamped on group B packets
pub const GROUP_B_ADDR: Ipv4Addr = Ipv4Addr::new(128, 9, 9, 5);

/// Classification bucket assigned to a packet at generation time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupId {
    A,
    B,
}

impl GroupId {
    /// Both groups, in report order
    pub const ALL: [GroupId; 2] = [GroupId::A, GroupId::B];

    /// Source address bound to this group
    #[inline]
    pub fn addr(self) -> Ipv4Addr {
        match self {
            GroupId::A => GROUP_A_ADDR,
            GroupId::B => GROUP_B_ADDR,
        }
    }

    /// Reverse lookup from a source address
    pub fn from_addr(addr: Ipv4Addr) -> Option<Self> {
        if addr == GROUP_A_ADDR {
            Some(GroupId::A)
        } else if addr == GROUP_B_ADDR {
            Some(GroupId::B)
        } else {
            None
        }
    }

    /// 1-based index used in report lines
    #[inline]
    pub fn ordinal(self) -> u8 {
        match self {
            GroupId::A => 1,
            GroupId::B => 2,
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group{}", self.ordinal())
    }
}
