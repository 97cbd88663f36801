//! Merge stability harness runtime - pipelines and the run driver
//!
//! This crate provides:
//! - The pipeline interface the harness wires its stages onto
//! - An in-process loopback pipeline over a fabric of port channels
//! - Rate pacing for generator lanes
//! - The merge bridge with per-link impairment
//! - The run driver producing the final report
//! - Tracing subscriber setup

pub mod fabric;
pub mod harness;
pub mod impairment;
pub mod loopback;
pub mod merge;
pub mod pacer;
pub mod pipeline;
pub mod telemetry;

pub use fabric::*;
pub use harness::*;
pub use impairment::*;
pub use loopback::*;
pub use merge::*;
pub use pacer::*;
pub use pipeline::*;
pub use telemetry::*;
