//! Merge stability harness integrity layer
//!
//! Provides the per-packet stage bodies of a run:
//! - Header fingerprinting (MD5 over the header span, stored in the payload)
//! - Group generators stamping identity and fingerprint
//! - The integrity verifier classifying every arrival

pub mod fingerprint;
pub mod generator;
pub mod verifier;

pub use fingerprint::*;
pub use generator::*;
pub use verifier::*;
