//! Report file to collector request, through the public API.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use nyrkio_reporter::framework::junit::parse_junit_xml;
use nyrkio_reporter::git::GitInfo;
use nyrkio_reporter::orchestrator::Orchestrator;
use nyrkio_reporter::record::WireRecord;
use nyrkio_reporter::report::{MultiReporter, NullReporter, NyrkioReporter, RunContext};
use nyrkio_reporter::submit::{FailureReason, SubmitResult, Submitter, Transport};

#[derive(Clone, Default)]
struct Collector {
    requests: Arc<Mutex<Vec<(String, String, String)>>>,
}

#[async_trait]
impl Transport for Collector {
    async fn post_json(&self, url: &str, token: &str, body: &str) -> SubmitResult<u16> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), token.to_string(), body.to_string()));
        Ok(if url.contains("flaky") { 503 } else { 200 })
    }

    fn name(&self) -> &str {
        "collector"
    }
}

fn context() -> RunContext {
    let git = GitInfo {
        commit: "abc123".to_string(),
        commit_date: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        branch: "feature-x".to_string(),
    };
    RunContext::new("MyApp", "https://github.com/org/my-app", git).unwrap()
}

#[tokio::test]
async fn junit_report_is_submitted_record_by_record() {
    let xml = r#"<testsuites>
  <testsuite name="tests/homepage.spec">
    <testcase name="renders logo" time="0.842"/>
    <testcase name="flaky banner" time="0.5"><failure/></testcase>
    <testcase name="nav › opens menu" time="0.25"/>
  </testsuite>
</testsuites>"#;
    let events = parse_junit_xml(xml).unwrap();

    let collector = Collector::default();
    let submitter = Submitter::new(
        "https://nyrkio.example",
        "https://nyrkio.example",
        "injected-token",
        collector.clone(),
    );
    let nyrkio = Arc::new(NyrkioReporter::new(context(), submitter));
    let reporter = MultiReporter::new()
        .with_reporter(NullReporter)
        .with_reporter(nyrkio.clone());

    let summary = Orchestrator::new(reporter).run(&events).await;
    assert_eq!(summary.total_tests, 3);
    assert_eq!(summary.failed, 1);

    let report = nyrkio.take_flush_report().unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].reason, FailureReason::Status(503));

    let requests = collector.requests.lock().unwrap();
    let urls: Vec<_> = requests.iter().map(|(u, _, _)| u.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://nyrkio.example/api/v0/result/MyApp/feature-x/homepage.spec/renders%20logo",
            "https://nyrkio.example/api/v0/result/MyApp/feature-x/homepage.spec/flaky%20banner",
            "https://nyrkio.example/api/v0/result/MyApp/feature-x/homepage.spec/nav/opens%20menu",
        ]
    );
    assert!(requests.iter().all(|(_, token, _)| token == "injected-token"));

    assert_eq!(
        requests[0].2,
        r#"[{"timestamp":1705276800,"metrics":[{"name":"test duration","unit":"msec","value":842}],"attributes":{"git_repo":"https://github.com/org/my-app","branch":"feature-x","git_commit":"abc123"}}]"#
    );

    for (_, _, body) in requests.iter() {
        let parsed: Vec<WireRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].timestamp, 1705276800);
        assert_eq!(parsed[0].metrics.len(), 1);
        assert_eq!(parsed[0].metrics[0].name, "test duration");
        assert_eq!(parsed[0].metrics[0].unit, "msec");
    }
}
