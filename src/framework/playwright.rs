//! Playwright JSON report ingestion.
//!
//! The JSON reporter keeps the full suite tree, so it reproduces the
//! hierarchy a reporter would see at run time: run root, project, file,
//! then nested `describe` suites.
//!
//! ```json
//! {
//!   "suites": [{
//!     "title": "tests/homepage.spec.ts",
//!     "specs": [{
//!       "title": "renders logo",
//!       "tests": [{
//!         "projectName": "chromium",
//!         "results": [{ "status": "passed", "duration": 842 }]
//!       }]
//!     }],
//!     "suites": []
//!   }]
//! }
//! ```
//!
//! A test retried N times has N results; the last one is the one that
//! counts. Tests with no results never ran and produce no event.

use serde::Deserialize;

use super::{
    FrameworkError, FrameworkResult, Suite, SuiteKind, TestCase, TestEvent, TestOutcome, TestResult,
    millis_to_duration,
};

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    suites: Vec<JsonSuite>,
}

#[derive(Debug, Deserialize)]
struct JsonSuite {
    #[serde(default)]
    title: String,
    #[serde(default)]
    specs: Vec<JsonSpec>,
    #[serde(default)]
    suites: Vec<JsonSuite>,
}

#[derive(Debug, Deserialize)]
struct JsonSpec {
    title: String,
    #[serde(default)]
    tests: Vec<JsonTest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonTest {
    #[serde(default)]
    project_name: String,
    #[serde(default)]
    results: Vec<JsonResult>,
}

#[derive(Debug, Deserialize)]
struct JsonResult {
    #[serde(default)]
    status: String,
    #[serde(default)]
    duration: f64,
}

/// Parses a Playwright JSON report into test events, in report order.
pub fn parse_playwright_json(content: &str) -> FrameworkResult<Vec<TestEvent>> {
    let report: Report = serde_json::from_str(content)
        .map_err(|e| FrameworkError::ParseError(format!("Invalid Playwright JSON: {}", e)))?;

    let mut events = Vec::new();
    let mut stack = Vec::new();
    for suite in &report.suites {
        walk(suite, &mut stack, &mut events);
    }
    Ok(events)
}

fn walk<'a>(suite: &'a JsonSuite, stack: &mut Vec<&'a str>, events: &mut Vec<TestEvent>) {
    stack.push(suite.title.as_str());

    for spec in &suite.specs {
        for test in &spec.tests {
            let Some(last) = test.results.last() else {
                continue;
            };
            events.push(TestEvent::new(
                build_case(&spec.title, &test.project_name, stack),
                to_result(last),
            ));
        }
    }

    for child in &suite.suites {
        walk(child, stack, events);
    }

    stack.pop();
}

fn build_case(title: &str, project: &str, stack: &[&str]) -> TestCase {
    let mut test = TestCase::new(title).with_ancestor(Suite::root());
    if !project.is_empty() {
        test = test.with_ancestor(Suite::new(project, SuiteKind::Project));
    }
    for (depth, suite_title) in stack.iter().enumerate() {
        let kind = if depth == 0 {
            SuiteKind::File
        } else {
            SuiteKind::Describe
        };
        test = test.with_ancestor(Suite::new(*suite_title, kind));
    }
    test
}

fn to_result(result: &JsonResult) -> TestResult {
    let outcome = match result.status.as_str() {
        "passed" => TestOutcome::Passed,
        "failed" => TestOutcome::Failed,
        "skipped" => TestOutcome::Skipped,
        _ => TestOutcome::Error,
    };
    TestResult::new(outcome).with_duration(millis_to_duration(result.duration))
}
