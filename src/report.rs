//! Test reporting.
//!
//! Reporters receive the events of a run: its start, one event per finished
//! test, and its end. The [`nyrkio::NyrkioReporter`] accumulates results
//! and submits them when the run ends; the [`ConsoleReporter`] shows
//! progress in the terminal.

pub mod nyrkio;

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::framework::{TestCase, TestOutcome, TestResult};
use crate::orchestrator::RunSummary;

pub use nyrkio::{NyrkioReporter, ReporterError, RunContext};

/// A test reporter receives events during a test run.
///
/// Events arrive one at a time; implementations never see two concurrent
/// calls from the [`Orchestrator`](crate::orchestrator::Orchestrator).
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Called once before any test result, with the number of results to come.
    async fn on_run_start(&self, total_tests: usize);

    /// Called when a test finishes.
    async fn on_test_end(&self, test: &TestCase, result: &TestResult);

    /// Called once after all tests have finished.
    async fn on_run_end(&self, summary: &RunSummary);
}

/// A reporter that does nothing (for testing or when output is not needed).
pub struct NullReporter;

#[async_trait]
impl Reporter for NullReporter {
    async fn on_run_start(&self, _total_tests: usize) {}
    async fn on_test_end(&self, _test: &TestCase, _result: &TestResult) {}
    async fn on_run_end(&self, _summary: &RunSummary) {}
}

/// A reporter that forwards every event to several reporters, in the order
/// they were added.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    /// Add a reporter to the multi-reporter.
    pub fn with_reporter<R: Reporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Default for MultiReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Reporter for MultiReporter {
    async fn on_run_start(&self, total_tests: usize) {
        for reporter in &self.reporters {
            reporter.on_run_start(total_tests).await;
        }
    }

    async fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        for reporter in &self.reporters {
            reporter.on_test_end(test, result).await;
        }
    }

    async fn on_run_end(&self, summary: &RunSummary) {
        for reporter in &self.reporters {
            reporter.on_run_end(summary).await;
        }
    }
}

#[async_trait]
impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    async fn on_run_start(&self, total_tests: usize) {
        (**self).on_run_start(total_tests).await;
    }

    async fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        (**self).on_test_end(test, result).await;
    }

    async fn on_run_end(&self, summary: &RunSummary) {
        (**self).on_run_end(summary).await;
    }
}

/// Console reporter that shows progress in the terminal.
pub struct ConsoleReporter {
    progress: Mutex<Option<indicatif::ProgressBar>>,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            progress: Mutex::new(None),
            verbose,
        }
    }
}

#[async_trait]
impl Reporter for ConsoleReporter {
    async fn on_run_start(&self, total_tests: usize) {
        println!("Processing {} test results", total_tests);

        let pb = indicatif::ProgressBar::new(total_tests as u64);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        *self.progress.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }

    async fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        let guard = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(pb) = guard.as_ref() else {
            return;
        };
        pb.inc(1);

        if self.verbose || !result.outcome.is_success() {
            let status = match result.outcome {
                TestOutcome::Passed => console::style("PASS").green(),
                TestOutcome::Failed => console::style("FAIL").red(),
                TestOutcome::Skipped => console::style("SKIP").yellow(),
                TestOutcome::Error => console::style("ERR ").red().bold(),
            };
            let line = format!(
                "{} {} ({:.0} ms)",
                status,
                test.full_title(),
                result.duration_ms()
            );
            // A hidden bar (no terminal) swallows println
            if pb.is_hidden() {
                println!("{}", line);
            } else {
                pb.println(line);
            }
        }
    }

    async fn on_run_end(&self, summary: &RunSummary) {
        if let Some(pb) = self
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pb.finish_and_clear();
        }

        println!();
        println!("Test Results:");
        println!("  Total:   {}", summary.total_tests);
        println!("  Passed:  {}", console::style(summary.passed).green());
        println!("  Failed:  {}", console::style(summary.failed).red());
        println!("  Skipped: {}", console::style(summary.skipped).yellow());
        println!("  Test time: {:?}", summary.total_duration);
    }
}
