//! Final report and pass/fail decision
//!
//! A report is computed once from a counter snapshot after the completion
//! signal fired. All ratios are percentages. A ratio whose denominator is
//! zero is `None` and the run fails with an explicit insufficient-data
//! reason instead of dividing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CompletionCause, CounterSnapshot, GroupId};

/// Largest allowed gap between the two groups' shares of the received flow,
/// in percentage points (exclusive)
pub const MAX_SHARE_DIFF: f64 = 4.0;

/// A counter that was zero where a ratio needed it as denominator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZeroCounter {
    SentA,
    SentB,
    Received,
}

impl fmt::Display for ZeroCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroCounter::SentA => f.write_str("no Group1 packets sent"),
            ZeroCounter::SentB => f.write_str("no Group2 packets sent"),
            ZeroCounter::Received => f.write_str("no intact group packets received"),
        }
    }
}

/// Why a run failed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FailReason {
    /// The run ended on its deadline, not on the packet target
    TimedOut,
    InsufficientData(ZeroCounter),
    /// The merged flow favoured one group
    Imbalance { share_a: f64, share_b: f64 },
    /// Too few packets came back
    LowYield { overall: f64, limit: u64 },
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::TimedOut => f.write_str("timed out before the packet target was reached"),
            FailReason::InsufficientData(zero) => write!(f, "insufficient data: {}", zero),
            FailReason::Imbalance { share_a, share_b } => write!(
                f,
                "group proportions differ by {:.1} points (limit {})",
                (share_a - share_b).abs(),
                MAX_SHARE_DIFF
            ),
            FailReason::LowYield { overall, limit } => write!(
                f,
                "received/sent ratio {:.1} % does not exceed {} %",
                overall, limit
            ),
        }
    }
}

/// Run verdict
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail(Vec<FailReason>),
}

impl Verdict {
    #[inline]
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Failure reasons, empty on pass
    pub fn reasons(&self) -> &[FailReason] {
        match self {
            Verdict::Pass => &[],
            Verdict::Fail(reasons) => reasons,
        }
    }
}

/// Derived ratios, in percent
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratios {
    /// received_a / sent_a
    pub yield_a: Option<f64>,
    /// received_b / sent_b
    pub yield_b: Option<f64>,
    /// received_a / received
    pub share_a: Option<f64>,
    /// received_b / received
    pub share_b: Option<f64>,
    /// received / sent
    pub overall: Option<f64>,
}

impl Ratios {
    pub fn from_snapshot(counters: &CounterSnapshot) -> Self {
        let received = counters.received();
        Ratios {
            yield_a: percent(counters.received_a, counters.sent_a),
            yield_b: percent(counters.received_b, counters.sent_b),
            share_a: percent(counters.received_a, received),
            share_b: percent(counters.received_b, received),
            overall: percent(received, counters.sent()),
        }
    }

    pub fn yield_for(&self, group: GroupId) -> Option<f64> {
        match group {
            GroupId::A => self.yield_a,
            GroupId::B => self.yield_b,
        }
    }

    pub fn share_for(&self, group: GroupId) -> Option<f64> {
        match group {
            GroupId::A => self.share_a,
            GroupId::B => self.share_b,
        }
    }
}

#[inline]
fn percent(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 * 100.0 / denominator as f64)
    }
}

/// Read-only result of a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub counters: CounterSnapshot,
    pub ratios: Ratios,
    pub passed_limit: u64,
    pub cause: CompletionCause,
    pub verdict: Verdict,
}

impl Report {
    /// Compute ratios and verdict from a final snapshot.
    ///
    /// PASS requires the run to have reached its target, both groups' shares
    /// of the received flow to differ by less than [`MAX_SHARE_DIFF`] points,
    /// and the overall yield to be strictly above `passed_limit`.
    pub fn evaluate(counters: CounterSnapshot, passed_limit: u64, cause: CompletionCause) -> Self {
        let ratios = Ratios::from_snapshot(&counters);
        let mut reasons = Vec::new();

        if cause == CompletionCause::TimedOut {
            reasons.push(FailReason::TimedOut);
        }

        if counters.sent_a == 0 {
            reasons.push(FailReason::InsufficientData(ZeroCounter::SentA));
        }
        if counters.sent_b == 0 {
            reasons.push(FailReason::InsufficientData(ZeroCounter::SentB));
        }
        if counters.received() == 0 {
            reasons.push(FailReason::InsufficientData(ZeroCounter::Received));
        }

        let sent_both = counters.sent_a > 0 && counters.sent_b > 0;
        if let (true, Some(share_a), Some(share_b), Some(overall)) =
            (sent_both, ratios.share_a, ratios.share_b, ratios.overall)
        {
            if (share_a - share_b).abs() >= MAX_SHARE_DIFF {
                reasons.push(FailReason::Imbalance { share_a, share_b });
            }
            if overall <= passed_limit as f64 {
                reasons.push(FailReason::LowYield {
                    overall,
                    limit: passed_limit,
                });
            }
        }

        let verdict = if reasons.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail(reasons)
        };

        Report {
            counters,
            ratios,
            passed_limit,
            cause,
            verdict,
        }
    }

    #[inline]
    pub fn passed(&self) -> bool {
        self.verdict.passed()
    }
}

struct Pct(Option<f64>);

impl fmt::Display for Pct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{:.1} %", v),
            None => f.write_str("n/a"),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sent {} packets", self.counters.sent())?;
        writeln!(f, "Received {} packets", self.counters.received())?;
        for group in GroupId::ALL {
            writeln!(f, "{} ratio = {}", group, Pct(self.ratios.yield_for(group)))?;
        }
        for group in GroupId::ALL {
            writeln!(
                f,
                "{} proportion in received flow = {}",
                group,
                Pct(self.ratios.share_for(group))
            )?;
        }
        writeln!(f, "Broken = {} packets", self.counters.broken)?;

        match &self.verdict {
            Verdict::Pass => write!(f, "TEST PASSED"),
            Verdict::Fail(reasons) => {
                for reason in reasons {
                    writeln!(f, "Reason: {}", reason)?;
                }
                write!(f, "TEST FAILED")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(sent_a: u64, sent_b: u64, received_a: u64, received_b: u64) -> CounterSnapshot {
        CounterSnapshot {
            sent_a,
            sent_b,
            received_a,
            received_b,
            received_total: received_a + received_b,
            broken: 0,
        }
    }

    #[test]
    fn test_balanced_run_passes() {
        let report = Report::evaluate(
            snapshot(1000, 1000, 900, 900),
            85,
            CompletionCause::TargetReached,
        );

        assert_eq!(report.ratios.share_a, Some(50.0));
        assert_eq!(report.ratios.share_b, Some(50.0));
        assert_eq!(report.ratios.yield_a, Some(90.0));
        assert_eq!(report.ratios.overall, Some(90.0));
        assert!(report.passed());
    }

    #[test]
    fn test_biased_run_fails_regardless_of_yield() {
        let report = Report::evaluate(
            snapshot(1000, 1000, 950, 700),
            50,
            CompletionCause::TargetReached,
        );

        let share_a = report.ratios.share_a.unwrap();
        let share_b = report.ratios.share_b.unwrap();
        assert!((share_a - 57.58).abs() < 0.01);
        assert!((share_b - 42.42).abs() < 0.01);
        assert_eq!(
            report.verdict,
            Verdict::Fail(vec![FailReason::Imbalance { share_a, share_b }])
        );
    }

    #[test]
    fn test_low_yield_fails() {
        let report = Report::evaluate(
            snapshot(1000, 1000, 800, 800),
            85,
            CompletionCause::TargetReached,
        );
        assert_eq!(
            report.verdict,
            Verdict::Fail(vec![FailReason::LowYield {
                overall: 80.0,
                limit: 85
            }])
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        // 52/48 split: exactly 4 points apart
        let report = Report::evaluate(
            snapshot(1000, 1000, 520, 480),
            10,
            CompletionCause::TargetReached,
        );
        assert!(matches!(
            report.verdict.reasons(),
            [FailReason::Imbalance { .. }]
        ));

        // yield exactly at the limit
        let report = Report::evaluate(
            snapshot(100, 100, 85, 85),
            85,
            CompletionCause::TargetReached,
        );
        assert!(matches!(
            report.verdict.reasons(),
            [FailReason::LowYield { .. }]
        ));
    }

    #[test]
    fn test_zero_sent_is_insufficient_data() {
        let report = Report::evaluate(
            snapshot(0, 1000, 0, 900),
            85,
            CompletionCause::TargetReached,
        );

        assert_eq!(report.ratios.yield_a, None);
        assert_eq!(report.ratios.yield_b, Some(90.0));
        assert_eq!(
            report.verdict,
            Verdict::Fail(vec![FailReason::InsufficientData(ZeroCounter::SentA)])
        );
    }

    #[test]
    fn test_nothing_received_is_insufficient_data() {
        let report = Report::evaluate(
            snapshot(1000, 1000, 0, 0),
            85,
            CompletionCause::TargetReached,
        );

        assert_eq!(report.ratios.share_a, None);
        assert_eq!(report.ratios.overall, Some(0.0));
        assert_eq!(
            report.verdict,
            Verdict::Fail(vec![FailReason::InsufficientData(ZeroCounter::Received)])
        );
    }

    #[test]
    fn test_timed_out_never_passes() {
        let report = Report::evaluate(
            snapshot(1000, 1000, 900, 900),
            85,
            CompletionCause::TimedOut,
        );
        assert_eq!(report.verdict, Verdict::Fail(vec![FailReason::TimedOut]));
    }

    #[test]
    fn test_display_lines() {
        let report = Report::evaluate(
            snapshot(1000, 1000, 900, 900),
            85,
            CompletionCause::TargetReached,
        );
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Sent 2000 packets",
                "Received 1800 packets",
                "Group1 ratio = 90.0 %",
                "Group2 ratio = 90.0 %",
                "Group1 proportion in received flow = 50.0 %",
                "Group2 proportion in received flow = 50.0 %",
                "Broken = 0 packets",
                "TEST PASSED",
            ]
        );
    }

    #[test]
    fn test_display_failure_reasons() {
        let report = Report::evaluate(snapshot(0, 0, 0, 0), 85, CompletionCause::TimedOut);
        let text = report.to_string();

        assert!(text.contains("Group1 ratio = n/a"));
        assert!(text.contains("Reason: timed out"));
        assert!(text.contains("Reason: insufficient data: no Group1 packets sent"));
        assert!(text.ends_with("TEST FAILED"));
    }

    #[test]
    fn test_report_serializes() {
        let report = Report::evaluate(
            snapshot(10, 10, 9, 9),
            85,
            CompletionCause::TargetReached,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["counters"]["sent_a"], 10);
        assert_eq!(json["verdict"], "Pass");
    }

    proptest! {
        #[test]
        fn verdict_is_total(
            sent_a in 0u64..10_000,
            sent_b in 0u64..10_000,
            received_a in 0u64..10_000,
            received_b in 0u64..10_000,
            limit in 0u64..=100,
        ) {
            let received_a = received_a.min(sent_a);
            let received_b = received_b.min(sent_b);
            let report = Report::evaluate(
                snapshot(sent_a, sent_b, received_a, received_b),
                limit,
                CompletionCause::TargetReached,
            );

            for ratio in [report.ratios.yield_a, report.ratios.yield_b, report.ratios.share_a,
                          report.ratios.share_b, report.ratios.overall].into_iter().flatten() {
                prop_assert!(ratio.is_finite());
            }

            if report.passed() {
                let diff = (report.ratios.share_a.unwrap() - report.ratios.share_b.unwrap()).abs();
                prop_assert!(diff < MAX_SHARE_DIFF);
                prop_assert!(report.ratios.overall.unwrap() > limit as f64);
            }
        }
    }
}
