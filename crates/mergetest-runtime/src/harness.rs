//! Run driver
//!
//! Wires both group generators and the integrity verifier onto a pipeline,
//! starts it, waits for completion and turns the final counters into a
//! [`Report`].

use std::future;
use std::sync::Arc;
use std::time::Duration;

use mergetest_core::{
    CompletionCause, CompletionSignal, CounterSet, GroupId, HarnessConfig, HarnessError,
    HarnessResult, Report,
};
use mergetest_integrity::{GroupGenerator, IntegrityVerifier};
use tokio::runtime::Runtime;
use tokio::time::Instant;
use tracing::{error, info};

use crate::Pipeline;

/// Multi-threaded runtime with `cores` workers
pub fn build_runtime(cores: usize) -> HarnessResult<Runtime> {
    if cores == 0 {
        return Err(HarnessError::Config("core count must be positive".into()));
    }
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cores)
        .thread_name("mergetest-lane")
        .enable_all()
        .build()
        .map_err(|e| HarnessError::Pipeline(format!("failed to build runtime: {}", e)))
}

/// Shared state of one run
#[derive(Debug, Default)]
pub struct RunState {
    pub counters: Arc<CounterSet>,
    pub completion: Arc<CompletionSignal>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compose the run's stages onto `pipeline`:
/// generator A → `outport1`, generator B → `outport2`,
/// receiver on `inport` → verifier → stopper.
pub fn wire<P: Pipeline>(
    config: &HarnessConfig,
    pipeline: &mut P,
    state: &RunState,
) -> HarnessResult<()> {
    for (group, port) in [
        (GroupId::A, config.outport1),
        (GroupId::B, config.outport2),
    ] {
        let generator = GroupGenerator::new(group, config.payload_size, state.counters.clone());
        let flow = pipeline.set_generator(Arc::new(generator), config.speed)?;
        pipeline.set_sender(flow, port)?;
    }

    let verifier = IntegrityVerifier::new(
        state.counters.clone(),
        state.completion.clone(),
        config.total_packets,
    );
    let flow = pipeline.set_receiver(config.inport)?;
    pipeline.set_handler(flow, Arc::new(verifier))?;
    pipeline.set_stopper(flow)
}

enum Outcome {
    Completed(CompletionCause),
    Failed(HarnessError),
}

/// Run one test to completion. Must be called from within a multi-threaded
/// tokio runtime.
pub async fn run<P: Pipeline>(config: &HarnessConfig, mut pipeline: P) -> HarnessResult<Report> {
    config.validate()?;

    let state = RunState::new();
    wire(config, &mut pipeline, &state)?;
    let mut handle = pipeline.start()?;

    info!(
        speed = config.speed,
        outport1 = config.outport1,
        outport2 = config.outport2,
        inport = config.inport,
        total_packets = config.total_packets,
        timeout = ?config.timeout,
        "test run started"
    );
    let started = Instant::now();

    let outcome = tokio::select! {
        cause = state.completion.wait() => Outcome::Completed(cause),
        _ = deadline(config.timeout) => {
            state.completion.fire(CompletionCause::TimedOut);
            Outcome::Completed(state.completion.state().unwrap_or(CompletionCause::TimedOut))
        }
        err = handle.failure() => Outcome::Failed(err),
    };

    handle.shutdown().await;

    let cause = match outcome {
        Outcome::Completed(cause) => cause,
        Outcome::Failed(e) => {
            error!(error = %e, "test run aborted");
            return Err(e);
        }
    };

    let snapshot = state.counters.snapshot();
    let report = Report::evaluate(snapshot, config.passed_limit, cause);
    info!(
        ?cause,
        elapsed = ?started.elapsed(),
        sent = snapshot.sent(),
        received = snapshot.received(),
        broken = snapshot.broken,
        passed = report.passed(),
        "test run finished"
    );
    Ok(report)
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => future::pending().await,
    }
}
