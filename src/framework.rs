//! Test descriptors and ingestion of test-runner output.
//!
//! The browser-automation test runner is the source of "test finished"
//! events. A finished test is described by a [`TestCase`] (its title and
//! the chain of suites it is nested in) and a [`TestResult`] (how long it
//! took and how it ended).
//!
//! Test runners write their results to report files. This module reads the
//! two formats that carry enough structure to rebuild the suite nesting:
//!
//! | Format | Parser | Suite nesting |
//! |--------|--------|---------------|
//! | JUnit XML | [`junit::parse_junit_xml`] | nested `<testsuite>` elements, ` › ` in test names |
//! | Playwright JSON | [`playwright::parse_playwright_json`] | nested `suites`, `projectName` |
//!
//! ```text
//!   report file ──► load_results() ──► Vec<TestEvent> ──► Orchestrator ──► Reporter
//! ```

pub mod junit;
pub mod playwright;

use std::path::Path;
use std::time::Duration;


/// Result type for ingestion operations.
pub type FrameworkResult<T> = Result<T, FrameworkError>;

/// Errors that can occur while reading test-runner output.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// The report could not be parsed.
    #[error("Failed to parse test report: {0}")]
    ParseError(String),

    /// The report file extension is not one we know how to read.
    #[error("Unsupported report format: {0} (expected .xml or .json)")]
    UnsupportedFormat(String),

    /// I/O error reading the report.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a suite sits in the test runner's hierarchy.
///
/// Only [`SuiteKind::Root`] is treated specially: it is the synthetic
/// top-level node of a run and never contributes to a result path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteKind {
    /// Synthetic run root.
    Root,
    /// A runner project (browser configuration, etc).
    Project,
    /// A test file.
    File,
    /// A `describe` block inside a file.
    Describe,
}

/// A suite that encloses a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub title: String,
    pub kind: SuiteKind,
}

impl Suite {
    pub fn new(title: impl Into<String>, kind: SuiteKind) -> Self {
        Self {
            title: title.into(),
            kind,
        }
    }

    /// The synthetic run root.
    pub fn root() -> Self {
        Self::new("", SuiteKind::Root)
    }

    pub fn is_root(&self) -> bool {
        self.kind == SuiteKind::Root
    }
}

/// A single test case as seen when it finishes.
///
/// `ancestors` is ordered from the outermost suite (usually the run root)
/// to the innermost one directly enclosing the test.
///
/// ```
/// use nyrkio_reporter::framework::{Suite, SuiteKind, TestCase};
///
/// let test = TestCase::new("renders logo")
///     .with_ancestor(Suite::root())
///     .with_ancestor(Suite::new("tests/homepage.spec", SuiteKind::File));
///
/// assert_eq!(test.ancestors.len(), 2);
/// assert_eq!(test.full_title(), "tests/homepage.spec › renders logo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// The test's own title.
    pub title: String,

    /// Enclosing suites, outermost first.
    pub ancestors: Vec<Suite>,
}

impl TestCase {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ancestors: Vec::new(),
        }
    }

    /// Appends a suite as the new innermost ancestor.
    pub fn with_ancestor(mut self, suite: Suite) -> Self {
        self.ancestors.push(suite);
        self
    }

    /// Builds a test from a chain that starts at the directly enclosing
    /// suite and walks outwards, the order a parent-link traversal yields.
    pub fn from_parent_chain<I>(title: impl Into<String>, parents: I) -> Self
    where
        I: IntoIterator<Item = Suite>,
    {
        let mut ancestors: Vec<Suite> = parents.into_iter().collect();
        ancestors.reverse();
        Self {
            title: title.into(),
            ancestors,
        }
    }

    /// Human-readable title including every titled, non-root ancestor.
    pub fn full_title(&self) -> String {
        self.ancestors
            .iter()
            .filter(|s| !s.is_root() && !s.title.is_empty())
            .map(|s| s.title.as_str())
            .chain(std::iter::once(self.title.as_str()))
            .collect::<Vec<_>>()
            .join(" › ")
    }
}

/// The outcome status of a finished test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
    /// Crashed, timed out, or was interrupted.
    Error,
}

impl TestOutcome {
    /// Returns `true` for outcomes that don't fail a run.
    pub fn is_success(&self) -> bool {
        matches!(self, TestOutcome::Passed | TestOutcome::Skipped)
    }
}

/// How a test ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub outcome: TestOutcome,

    /// Wall-clock time the test took.
    pub duration: Duration,
}

impl TestResult {
    pub fn new(outcome: TestOutcome) -> Self {
        Self {
            outcome,
            duration: Duration::ZERO,
        }
    }

    /// Sets the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Duration in whole and fractional milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_nanos() as f64 / 1_000_000.0
    }
}

/// Converts a possibly fractional millisecond count, clamping garbage to zero.
pub(crate) fn millis_to_duration(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_micros((ms * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

/// One "test finished" event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEvent {
    pub test: TestCase,
    pub result: TestResult,
}

impl TestEvent {
    pub fn new(test: TestCase, result: TestResult) -> Self {
        Self { test, result }
    }
}

/// Reads a report file, picking the parser from the file extension.
pub fn load_results(path: &Path) -> FrameworkResult<Vec<TestEvent>> {
    let content = std::fs::read_to_string(path)?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("xml") => junit::parse_junit_xml(&content),
        Some("json") => playwright::parse_playwright_json(&content),
        _ => Err(FrameworkError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Reads several report files, concatenating their events in the order given.
pub fn load_all_results<P: AsRef<Path>>(paths: &[P]) -> FrameworkResult<Vec<TestEvent>> {
    let mut events = Vec::new();
    for path in paths {
        let loaded = load_results(path.as_ref())?;
        tracing::debug!(
            "Loaded {} test results from {}",
            loaded.len(),
            path.as_ref().display()
        );
        events.extend(loaded);
    }
    Ok(events)
}
