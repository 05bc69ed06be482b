//! Run driver.
//!
//! Replays the "test finished" events of a run into a [`Reporter`]:
//!
//! ```text
//!   Vec<TestEvent> ──► on_run_start(n)
//!                      on_test_end(test, result)   × n, in input order
//!                      on_run_end(summary)
//! ```
//!
//! Each call is awaited before the next one starts, so reporters see a
//! strictly serialized stream even when the underlying test run was
//! parallel.

use std::time::Duration;

use tracing::info;

use crate::framework::{TestEvent, TestOutcome, TestResult};
use crate::report::Reporter;

/// Aggregate counts for a run.
///
/// # Exit Codes
///
/// | Code | Meaning |
/// |------|---------|
/// | 0 | All tests passed or were skipped |
/// | 1 | Some tests failed or errored |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Sum of all test durations.
    pub total_duration: Duration,
}

impl RunSummary {
    /// Counts one more finished test.
    pub fn record(&mut self, result: &TestResult) {
        self.total_tests += 1;
        self.total_duration += result.duration;
        match result.outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Skipped => self.skipped += 1,
            TestOutcome::Failed | TestOutcome::Error => self.failed += 1,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }
}

/// Feeds a run's events to a reporter.
pub struct Orchestrator<R> {
    reporter: R,
}

impl<R: Reporter> Orchestrator<R> {
    pub fn new(reporter: R) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Delivers every event, then signals the end of the run.
    pub async fn run(&self, events: &[TestEvent]) -> RunSummary {
        let mut summary = RunSummary::default();

        self.reporter.on_run_start(events.len()).await;

        for event in events {
            summary.record(&event.result);
            self.reporter.on_test_end(&event.test, &event.result).await;
        }

        info!(
            "Run complete: {} tests, {} passed, {} failed, {} skipped",
            summary.total_tests, summary.passed, summary.failed, summary.skipped
        );

        self.reporter.on_run_end(&summary).await;
        summary
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }
}
