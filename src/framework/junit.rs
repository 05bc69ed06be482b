//! JUnit XML report ingestion.
//!
//! Browser test runners write JUnit XML with one `<testsuite>` per test
//! file and flatten `describe` blocks into the test name using ` › ` as a
//! separator:
//!
//! ```xml
//! <testsuites>
//!   <testsuite name="tests/homepage.spec.ts">
//!     <testcase name="header › renders logo" time="0.842"/>
//!     <testcase name="footer › links" time="0.120">
//!       <failure message="expected 3 links"/>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```
//!
//! Nested `<testsuite>` elements (emitted by some producers) are treated as
//! describe blocks under the outermost file suite.

use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{
    FrameworkError, FrameworkResult, Suite, SuiteKind, TestCase, TestEvent, TestOutcome, TestResult,
    millis_to_duration,
};

/// Separator used by test runners to flatten nested titles.
pub const TITLE_SEPARATOR: &str = " › ";

/// A `<testcase>` whose closing tag hasn't been seen yet.
struct PendingCase {
    name: String,
    duration: Duration,
    outcome: TestOutcome,
}

/// Parses JUnit XML into test events, in document order.
pub fn parse_junit_xml(content: &str) -> FrameworkResult<Vec<TestEvent>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut events = Vec::new();
    let mut suites: Vec<String> = Vec::new();
    let mut pending: Option<PendingCase> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FrameworkError::ParseError(format!(
                "{} at position {}",
                e,
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"testsuite" => suites.push(attr(&e, "name")?.unwrap_or_default()),
                b"testcase" => pending = Some(pending_case(&e)?),
                tag => {
                    if let Some(case) = pending.as_mut() {
                        apply_child(case, tag);
                    }
                }
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"testcase" => {
                    let case = pending_case(&e)?;
                    events.push(to_event(&suites, case));
                }
                tag => {
                    if let Some(case) = pending.as_mut() {
                        apply_child(case, tag);
                    }
                }
            },
            Event::End(e) => match e.name().as_ref() {
                b"testsuite" => {
                    suites.pop();
                }
                b"testcase" => {
                    if let Some(case) = pending.take() {
                        events.push(to_event(&suites, case));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(events)
}

fn attr(e: &BytesStart<'_>, name: &str) -> FrameworkResult<Option<String>> {
    let found = e
        .try_get_attribute(name)
        .map_err(|err| FrameworkError::ParseError(format!("Invalid attribute: {}", err)))?;

    match found {
        Some(a) => {
            let value = a
                .unescape_value()
                .map_err(|err| FrameworkError::ParseError(format!("Invalid attribute value: {}", err)))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

fn pending_case(e: &BytesStart<'_>) -> FrameworkResult<PendingCase> {
    let name = attr(e, "name")?.unwrap_or_default();
    let secs: f64 = attr(e, "time")?
        .and_then(|t| t.trim().parse().ok())
        .unwrap_or(0.0);

    Ok(PendingCase {
        name,
        duration: millis_to_duration(secs * 1000.0),
        outcome: TestOutcome::Passed,
    })
}

fn apply_child(case: &mut PendingCase, tag: &[u8]) {
    match tag {
        b"failure" => case.outcome = TestOutcome::Failed,
        b"error" => case.outcome = TestOutcome::Error,
        b"skipped" if case.outcome == TestOutcome::Passed => case.outcome = TestOutcome::Skipped,
        _ => {}
    }
}

fn to_event(suites: &[String], case: PendingCase) -> TestEvent {
    let mut test = TestCase::new("").with_ancestor(Suite::root());

    for (depth, title) in suites.iter().enumerate() {
        let kind = if depth == 0 {
            SuiteKind::File
        } else {
            SuiteKind::Describe
        };
        test = test.with_ancestor(Suite::new(title.clone(), kind));
    }

    let mut parts: Vec<&str> = case.name.split(TITLE_SEPARATOR).collect();
    let title = parts.pop().unwrap_or_default();
    for describe in parts {
        test = test.with_ancestor(Suite::new(describe, SuiteKind::Describe));
    }
    test.title = title.to_string();

    TestEvent::new(
        test,
        TestResult::new(case.outcome).with_duration(case.duration),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuites tests="3">
  <testsuite name="tests/homepage.spec" tests="3">
    <testcase name="renders logo" classname="tests/homepage.spec" time="0.842"/>
    <testcase name="footer › has links" time="1.5">
      <failure message="expected 3 links">stack</failure>
    </testcase>
    <testcase name="slow thing" time="0">
      <skipped/>
    </testcase>
  </testsuite>
</testsuites>"#;

    #[test]
    fn test_parse_sample() {
        let events = parse_junit_xml(SAMPLE).unwrap();
        assert_eq!(events.len(), 3);

        let first = &events[0];
        assert_eq!(first.test.title, "renders logo");
        assert_eq!(first.test.ancestors.len(), 2);
        assert!(first.test.ancestors[0].is_root());
        assert_eq!(first.test.ancestors[1].title, "tests/homepage.spec");
        assert_eq!(first.test.ancestors[1].kind, SuiteKind::File);
        assert_eq!(first.result.duration, Duration::from_millis(842));
        assert_eq!(first.result.outcome, TestOutcome::Passed);
    }

    #[test]
    fn test_describe_blocks_split_from_name() {
        let events = parse_junit_xml(SAMPLE).unwrap();
        let second = &events[1];
        assert_eq!(second.test.title, "has links");
        assert_eq!(second.test.ancestors[2].title, "footer");
        assert_eq!(second.test.ancestors[2].kind, SuiteKind::Describe);
        assert_eq!(second.result.outcome, TestOutcome::Failed);
    }

    #[test]
    fn test_skipped_outcome() {
        let events = parse_junit_xml(SAMPLE).unwrap();
        assert_eq!(events[2].result.outcome, TestOutcome::Skipped);
        assert_eq!(events[2].result.duration, Duration::ZERO);
    }

    #[test]
    fn test_nested_testsuites_become_describes() {
        let xml = r#"<testsuites>
  <testsuite name="file.spec">
    <testsuite name="group">
      <testcase name="inner" time="0.25"/>
    </testsuite>
    <testcase name="outer" time="0.5"/>
  </testsuite>
</testsuites>"#;
        let events = parse_junit_xml(xml).unwrap();
        assert_eq!(events.len(), 2);
        let titles: Vec<_> = events[0]
            .test
            .ancestors
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["", "file.spec", "group"]);
        assert_eq!(events[1].test.ancestors.len(), 2);
    }

    #[test]
    fn test_escaped_names_are_unescaped() {
        let xml = r#"<testsuites><testsuite name="a &amp; b"><testcase name="x &lt; y" time="0.001"/></testsuite></testsuites>"#;
        let events = parse_junit_xml(xml).unwrap();
        assert_eq!(events[0].test.ancestors[1].title, "a & b");
        assert_eq!(events[0].test.title, "x < y");
    }

    #[test]
    fn test_garbage_time_defaults_to_zero() {
        let xml = r#"<testsuites><testsuite name="s"><testcase name="t" time="-3"/><testcase name="u" time="abc"/></testsuite></testsuites>"#;
        let events = parse_junit_xml(xml).unwrap();
        assert_eq!(events[0].result.duration, Duration::ZERO);
        assert_eq!(events[1].result.duration, Duration::ZERO);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let xml = r#"<testsuites><testsuite name="s"></testcase></testsuites>"#;
        assert!(matches!(
            parse_junit_xml(xml),
            Err(FrameworkError::ParseError(_))
        ));
    }
}
