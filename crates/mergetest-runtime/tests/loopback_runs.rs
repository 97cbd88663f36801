//! End-to-end runs over the in-process loopback pipeline

use std::sync::Arc;
use std::time::Duration;

use mergetest_core::{
    CompletionCause, FailReason, HarnessConfig, HarnessError, ZeroCounter,
};
use mergetest_runtime::{run, Impairment, LoopbackPipeline, MergeSpec, PortFabric};

fn config() -> HarnessConfig {
    HarnessConfig::default()
        .with_speed(5_000)
        .with_total_packets(5_000)
        .with_passed_limit(80)
        .with_timeout(Duration::from_secs(30))
}

/// Two-port loopback merging ports 0 and 1 into ingress 0
fn merged(link_a: Impairment, link_b: Impairment) -> LoopbackPipeline {
    let mut pipeline = LoopbackPipeline::new(Arc::new(PortFabric::new(2, 1024)));
    pipeline
        .add_merge(
            &MergeSpec::new(0)
                .input(0, link_a)
                .input(1, link_b)
                .with_seed(7),
        )
        .unwrap();
    pipeline
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_clean_merge_passes() {
    let report = run(&config(), merged(Impairment::none(), Impairment::none()))
        .await
        .unwrap();

    assert_eq!(report.cause, CompletionCause::TargetReached);
    assert!(report.counters.received_total >= 5_000);
    assert_eq!(report.counters.broken, 0);
    assert_eq!(report.counters.unclassified(), 0);
    assert!(report.passed(), "{}", report);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lossy_link_is_imbalanced() {
    let report = run(
        &config(),
        merged(Impairment::none().with_loss(0.5), Impairment::none()),
    )
    .await
    .unwrap();

    assert!(!report.passed());
    assert!(report
        .verdict
        .reasons()
        .iter()
        .any(|r| matches!(r, FailReason::Imbalance { .. })));
    assert!(report.counters.received_a < report.counters.received_b);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_corruption_counts_as_broken() {
    let damaged = Impairment::none().with_corruption(1.0);
    let report = run(&config(), merged(damaged, damaged)).await.unwrap();

    assert_eq!(report.counters.received(), 0);
    assert_eq!(report.counters.broken, report.counters.received_total);
    assert!(report
        .verdict
        .reasons()
        .contains(&FailReason::InsufficientData(ZeroCounter::Received)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_foreign_frames_are_excluded() {
    let polluted = Impairment::none().with_foreign(1.0);
    let report = run(&config(), merged(polluted, polluted)).await.unwrap();

    let counters = report.counters;
    assert_eq!(report.cause, CompletionCause::TargetReached);
    assert!(counters.unclassified() > 0);
    assert_eq!(counters.broken, 0);
    assert_eq!(
        counters.received_total,
        counters.received() + counters.unclassified()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_merge_times_out() {
    let pipeline = LoopbackPipeline::new(Arc::new(PortFabric::new(2, 64)));
    let config = config().with_timeout(Duration::from_millis(200));

    let report = run(&config, pipeline).await.unwrap();

    assert_eq!(report.cause, CompletionCause::TimedOut);
    assert!(report.counters.sent() > 0);
    assert_eq!(report.counters.received_total, 0);
    let reasons = report.verdict.reasons();
    assert!(reasons.contains(&FailReason::TimedOut));
    assert!(reasons.contains(&FailReason::InsufficientData(ZeroCounter::Received)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_oversized_payload_aborts_run() {
    let config = config().with_payload_size(2_000);
    let result = run(&config, merged(Impairment::none(), Impairment::none())).await;

    assert!(matches!(result, Err(HarnessError::PacketAllocation(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unknown_port_is_a_wiring_error() {
    let config = config().with_ports(0, 5, 0);
    let result = run(&config, merged(Impairment::none(), Impairment::none())).await;

    assert!(matches!(result, Err(HarnessError::UnknownPort(5))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_send_port_for_both_groups() {
    let mut pipeline = LoopbackPipeline::new(Arc::new(PortFabric::new(1, 1024)));
    pipeline
        .add_merge(&MergeSpec::new(0).input(0, Impairment::none()))
        .unwrap();
    let config = config().with_ports(0, 0, 0);

    let report = run(&config, pipeline).await.unwrap();
    assert!(report.passed(), "{}", report);
}
