//! Result accumulation and submission to Nyrkiö.
//!
//! [`NyrkioReporter`] turns each finished test into a [`ResultRecord`] and
//! keeps the records, in arrival order, until the run ends. It then hands
//! them all to the [`Submitter`] and keeps the [`FlushReport`] for the
//! caller.
//!
//! Timestamp and attributes are the same for every record of a run. They
//! come from a [`RunContext`] built before the reporter exists, so a
//! checkout without usable source-control metadata fails before the first
//! test result is accepted.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Reporter;
use crate::config::Config;
use crate::framework::{TestCase, TestResult};
use crate::git::{GitError, GitInfo, GitResolver};
use crate::orchestrator::RunSummary;
use crate::path::build_path;
use crate::record::{Attributes, Metric, ResultRecord};
use crate::submit::{FlushReport, Submitter};

/// Configuration errors that stop reporting before any record is built.
#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("Project name must not be empty")]
    EmptyProjectName,

    #[error("Missing source-control metadata: {0}")]
    MissingGitMetadata(&'static str),

    #[error("Could not read source-control metadata: {0}")]
    Git(#[from] GitError),
}

/// Values shared by every record of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    project_name: String,
    git_repo: String,
    git: GitInfo,
}

impl RunContext {
    pub fn new(
        project_name: impl Into<String>,
        git_repo: impl Into<String>,
        git: GitInfo,
    ) -> Result<Self, ReporterError> {
        let project_name = project_name.into();
        if project_name.trim().is_empty() {
            return Err(ReporterError::EmptyProjectName);
        }
        if git.commit.trim().is_empty() {
            return Err(ReporterError::MissingGitMetadata("commit"));
        }
        if git.branch.trim().is_empty() {
            return Err(ReporterError::MissingGitMetadata("branch"));
        }

        Ok(Self {
            project_name,
            git_repo: git_repo.into(),
            git,
        })
    }

    /// Resolves git metadata for the configured checkout.
    ///
    /// `branch_override` takes precedence over `[git] branch` in the config.
    pub async fn resolve(config: &Config, branch_override: Option<&str>) -> Result<Self, ReporterError> {
        let mut resolver = GitResolver::new();
        if let Some(dir) = &config.git.working_dir {
            resolver = resolver.with_working_dir(dir);
        }
        if let Some(branch) = branch_override.or(config.git.branch.as_deref()) {
            resolver = resolver.with_branch(branch);
        }

        let git = resolver.resolve().await?;
        Self::new(&config.nyrkio.project_name, &config.nyrkio.git_repo, git)
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn branch(&self) -> &str {
        &self.git.branch
    }

    pub fn git(&self) -> &GitInfo {
        &self.git
    }

    /// Seconds since the epoch of the checked-out commit.
    pub fn timestamp(&self) -> i64 {
        self.git.timestamp()
    }

    fn attributes(&self) -> Attributes {
        Attributes {
            git_repo: self.git_repo.clone(),
            branch: self.git.branch.clone(),
            git_commit: self.git.commit.clone(),
        }
    }

    /// Builds the record for one finished test.
    pub fn build_record(&self, test: &TestCase, result: &TestResult) -> ResultRecord {
        ResultRecord {
            timestamp: self.timestamp(),
            metrics: vec![Metric::duration_ms(result.duration_ms())],
            attributes: self.attributes(),
            path: build_path(&self.project_name, &self.git.branch, test),
        }
    }
}

/// Collects one duration record per finished test and submits them when
/// the run ends.
pub struct NyrkioReporter {
    context: RunContext,
    records: Mutex<Vec<ResultRecord>>,
    submitter: Submitter,
    flush_report: Mutex<Option<FlushReport>>,
}

impl NyrkioReporter {
    pub fn new(context: RunContext, submitter: Submitter) -> Self {
        Self {
            context,
            records: Mutex::new(Vec::new()),
            submitter,
            flush_report: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Builds and stores the record for a finished test.
    pub fn record_test_end(&self, test: &TestCase, result: &TestResult) {
        let record = self.context.build_record(test, result);
        debug!("Recorded {} = {:.1} ms", record.path, result.duration_ms());
        self.lock_records().push(record);
    }

    /// Snapshot of the records collected so far, in arrival order.
    pub fn records(&self) -> Vec<ResultRecord> {
        self.lock_records().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_records().is_empty()
    }

    /// Submits and drops every collected record.
    pub async fn flush(&self) -> FlushReport {
        let records = std::mem::take(&mut *self.lock_records());
        self.submitter.flush(records).await
    }

    /// The report of the last flush triggered by the end of a run.
    pub fn take_flush_report(&self) -> Option<FlushReport> {
        self.flush_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, Vec<ResultRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Reporter for NyrkioReporter {
    async fn on_run_start(&self, total_tests: usize) {
        debug!(
            "Collecting {} results for {} on {}",
            total_tests,
            self.context.project_name(),
            self.context.branch()
        );
    }

    async fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        self.record_test_end(test, result);
    }

    async fn on_run_end(&self, _summary: &RunSummary) {
        let report = self.flush().await;
        print_flush_report(&report);
        *self
            .flush_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(report);
    }
}

/// Prints the outcome of a flush for the user.
pub fn print_flush_report(report: &FlushReport) {
    println!();
    if report.total() == 0 {
        println!("{}", console::style("No results to submit to Nyrkiö.").dim());
        return;
    }

    println!(
        "Submitted {}/{} results to Nyrkiö",
        console::style(report.succeeded).green(),
        report.total()
    );

    for url in &report.view_urls {
        println!("  View results at {}", console::style(url).cyan().underlined());
    }

    if !report.is_success() {
        warn!("{} results were not accepted", report.failed());
        println!();
        println!("{}", console::style("Failed submissions:").red().bold());
        for failure in &report.failures {
            println!("  - {} ({})", failure.url, failure.reason);
            if !failure.body.is_empty() {
                println!("    {}", console::style(&failure.body).dim());
            }
        }
    }
}
