//! Hierarchical result paths.
//!
//! Every result is filed under a path built from the run configuration and
//! the test's suite nesting:
//!
//! ```text
//! <project> / <branch> / <outermost suite> / ... / <innermost suite> / <test title>
//! ```
//!
//! The synthetic run root and suites without a title are left out. Test
//! files usually live under a `tests/` directory, which would add the same
//! top-level segment to every path, so a leading `tests/` is stripped from
//! suite titles.
//!
//! The path is used twice: percent-encoded as the suffix of the submission
//! URL, and `/`-joined for display.

use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::framework::TestCase;

/// Prefix removed from suite titles.
pub const TESTS_DIR_PREFIX: &str = "tests/";

/// Characters escaped in each segment of a URL path. `/` is among them so
/// a slash inside a title cannot start a new segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// An ordered list of path segments: project, branch, then at least the
/// test title. Only [`build_path`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPath {
    segments: Vec<String>,
}

impl ResultPath {
    /// Segments from outermost to innermost.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The outermost segment.
    pub fn project(&self) -> &str {
        &self.segments[0]
    }

    /// The segment right after the project.
    pub fn branch(&self) -> &str {
        &self.segments[1]
    }

    /// Segments joined with `/`, unencoded.
    pub fn joined(&self) -> String {
        self.segments.join("/")
    }

    /// Segments percent-encoded one by one, then joined with `/` for a URL
    /// path.
    pub fn encoded(&self) -> String {
        self.segments
            .iter()
            .map(|segment| utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for ResultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.joined())
    }
}

/// Builds the result path for a test.
///
/// ```
/// use nyrkio_reporter::framework::{Suite, SuiteKind, TestCase};
/// use nyrkio_reporter::path::build_path;
///
/// let test = TestCase::new("case-c")
///     .with_ancestor(Suite::root())
///     .with_ancestor(Suite::new("tests/suite-a", SuiteKind::File))
///     .with_ancestor(Suite::new("sub-b", SuiteKind::Describe));
///
/// let path = build_path("Proj", "main", &test);
/// assert_eq!(path.segments(), ["Proj", "main", "suite-a", "sub-b", "case-c"]);
/// ```
pub fn build_path(project: &str, branch: &str, test: &TestCase) -> ResultPath {
    let mut segments = vec![test.title.clone()];

    for suite in test.ancestors.iter().rev() {
        if suite.is_root() || suite.title.is_empty() {
            continue;
        }
        let title = suite
            .title
            .strip_prefix(TESTS_DIR_PREFIX)
            .unwrap_or(&suite.title);
        segments.push(title.to_string());
    }

    segments.push(branch.to_string());
    segments.push(project.to_string());
    segments.reverse();

    ResultPath { segments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{Suite, SuiteKind};

    fn case(title: &str, suites: &[(&str, SuiteKind)]) -> TestCase {
        suites
            .iter()
            .fold(TestCase::new(title).with_ancestor(Suite::root()), |t, (s, k)| {
                t.with_ancestor(Suite::new(*s, *k))
            })
    }

    #[test]
    fn test_strips_tests_prefix() {
        let test = case(
            "case-c",
            &[("tests/suite-a", SuiteKind::File), ("sub-b", SuiteKind::Describe)],
        );
        let path = build_path("Proj", "main", &test);
        assert_eq!(path.segments(), ["Proj", "main", "suite-a", "sub-b", "case-c"]);
        assert_eq!(path.joined(), "Proj/main/suite-a/sub-b/case-c");
    }

    #[test]
    fn test_empty_ancestor_omitted() {
        let test = case(
            "case",
            &[("", SuiteKind::Project), ("file.spec", SuiteKind::File), ("", SuiteKind::Describe)],
        );
        let path = build_path("P", "b", &test);
        assert_eq!(path.segments(), ["P", "b", "file.spec", "case"]);
    }

    #[test]
    fn test_root_title_ignored_even_if_set() {
        let test = TestCase::new("case").with_ancestor(Suite::new("root", SuiteKind::Root));
        let path = build_path("P", "b", &test);
        assert_eq!(path.segments(), ["P", "b", "case"]);
    }

    #[test]
    fn test_prefix_stripped_only_at_start() {
        let test = case("case", &[("e2e/tests/x", SuiteKind::File)]);
        let path = build_path("P", "b", &test);
        assert_eq!(path.segments(), ["P", "b", "e2e/tests/x", "case"]);
    }

    #[test]
    fn test_project_suite_included() {
        let test = case(
            "case",
            &[("chromium", SuiteKind::Project), ("tests/a.spec", SuiteKind::File)],
        );
        let path = build_path("P", "b", &test);
        assert_eq!(path.segments(), ["P", "b", "chromium", "a.spec", "case"]);
    }

    #[test]
    fn test_encoded_escapes_spaces_per_segment() {
        let test = case("renders logo", &[("tests/homepage.spec", SuiteKind::File)]);
        let path = build_path("MyApp", "feature-x", &test);
        assert_eq!(path.encoded(), "MyApp/feature-x/homepage.spec/renders%20logo");
        assert_eq!(path.to_string(), "MyApp/feature-x/homepage.spec/renders logo");
    }

    #[test]
    fn test_encoded_escapes_reserved() {
        let test = TestCase::new("a?b#c%d");
        let path = build_path("P", "b", &test);
        assert_eq!(path.encoded(), "P/b/a%3Fb%23c%25d");
    }

    #[test]
    fn test_slash_in_title_stays_one_segment() {
        let test = case("a/b", &[("tests/e2e/home.spec", SuiteKind::File)]);
        let path = build_path("P", "feature/x", &test);
        assert_eq!(path.segments(), ["P", "feature/x", "e2e/home.spec", "a/b"]);
        assert_eq!(path.encoded(), "P/feature%2Fx/e2e%2Fhome.spec/a%2Fb");
        assert_eq!(path.encoded().split('/').count(), path.segments().len());
    }

    #[test]
    fn test_never_empty() {
        let path = build_path("", "", &TestCase::new(""));
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.project(), "");
        assert_eq!(path.branch(), "");
    }
}
