//! Merge stability harness core - shared run state and decision logic
//!
//! This crate defines the pieces every lane of a test run shares:
//! - Group identities and their source addresses
//! - The lock-free counter set
//! - The one-shot completion signal
//! - The report and pass/fail verdict
//! - Run configuration
//! - Stage traits composed by a pipeline

pub mod completion;
pub mod config;
pub mod counters;
pub mod error;
pub mod group;
pub mod report;
pub mod stage;

pub use completion::*;
pub use config::*;
pub use counters::*;
pub use error::*;
pub use group::*;
pub use report::*;
pub use stage::*;
