//! Merge stability harness wire layer - test packet buffers
//!
//! This crate builds and parses the synthetic packets that flow through the
//! pipeline under test:
//! - Ethernet + IPv4 + UDP layered construction with a fixed payload
//! - Transport header parsing (UDP, TCP, ICMP) yielding the payload offset
//! - Bounds-checked views over the header span and the payload

pub mod error;
pub mod layout;
pub mod packet;

pub use error::*;
pub use layout::*;
pub use packet::*;
