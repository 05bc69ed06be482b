//! Submission of result records to the collector.
//!
//! After a run ends, every accumulated record is posted on its own:
//!
//! ```text
//! POST {api_url}/api/v0/result/{encoded path}
//! Authorization: Bearer {token}
//! Content-Type: application/json
//!
//! [{"timestamp": ..., "metrics": [...], "attributes": {...}}]
//! ```
//!
//! Requests go out strictly one after another, in record order. A record
//! that fails (non-200 status, transport error, timeout) is logged with its
//! URL and body and recorded in the [`FlushReport`]; the remaining records
//! are still sent. Each request is bounded by a timeout, and the whole flush
//! by a deadline after which unsent records are reported as failed.

pub mod http;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::NyrkioConfig;
use crate::path::ResultPath;
use crate::record::ResultRecord;

pub use http::{DryRunTransport, HttpTransport};

/// Result type for a single request.
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Errors from a single request.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The request did not complete (connection refused, TLS, reset...).
    #[error("Request failed: {0}")]
    Transport(String),

    /// The request did not complete in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Sends one JSON body to one URL.
///
/// Returns the HTTP status code; interpreting it is up to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, token: &str, body: &str) -> SubmitResult<u16>;

    /// Transport name (for logging).
    fn name(&self) -> &str;
}

/// Why a record was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The collector answered with something other than 200.
    Status(u16),
    /// The request failed or timed out.
    Transport(String),
    /// The record could not be serialized.
    Serialize(String),
    /// The flush deadline passed before the record was sent.
    DeadlineExceeded,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Status(code) => write!(f, "HTTP {}", code),
            FailureReason::Transport(msg) => write!(f, "{}", msg),
            FailureReason::Serialize(msg) => write!(f, "serialization failed: {}", msg),
            FailureReason::DeadlineExceeded => write!(f, "flush deadline exceeded"),
        }
    }
}

/// A record that did not make it to the collector, with enough detail to
/// resend it by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFailure {
    pub url: String,
    pub body: String,
    pub reason: FailureReason,
}

/// Outcome of a flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records for which a request was issued.
    pub attempted: usize,

    /// Records the collector accepted.
    pub succeeded: usize,

    /// Records that were rejected, failed in transit, or never sent.
    pub failures: Vec<SubmissionFailure>,

    /// Distinct result pages touched by accepted records, in first-seen order.
    pub view_urls: Vec<String>,
}

impl FlushReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Posts result records to the collector.
///
/// The token is supplied by the caller; the client never looks it up.
pub struct Submitter {
    api_url: String,
    site_url: String,
    token: String,
    transport: Box<dyn Transport>,
    request_timeout: Duration,
    flush_deadline: Duration,
}

impl Submitter {
    pub fn new(
        api_url: impl Into<String>,
        site_url: impl Into<String>,
        token: impl Into<String>,
        transport: impl Transport + 'static,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            site_url: site_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            transport: Box::new(transport),
            request_timeout: Duration::from_secs(30),
            flush_deadline: Duration::from_secs(300),
        }
    }

    /// Creates a submitter from configuration using the given transport.
    pub fn from_config(
        config: &NyrkioConfig,
        token: impl Into<String>,
        transport: impl Transport + 'static,
    ) -> Self {
        Self::new(&config.api_url, &config.site_url, token, transport)
            .with_request_timeout(config.request_timeout())
            .with_flush_deadline(config.flush_deadline())
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_flush_deadline(mut self, deadline: Duration) -> Self {
        self.flush_deadline = deadline;
        self
    }

    /// Submission URL for a result path.
    pub fn result_url(&self, path: &ResultPath) -> String {
        format!("{}/api/v0/result/{}", self.api_url, path.encoded())
    }

    /// Page on the web UI listing results for a project and branch.
    pub fn view_url(&self, project: &str, branch: &str) -> String {
        format!("{}/tests/{}/{}", self.site_url, project, branch)
    }

    /// Sends every record, in order, one request at a time.
    ///
    /// Never fails as a whole; per-record problems end up in the report.
    pub async fn flush(&self, records: Vec<ResultRecord>) -> FlushReport {
        let mut report = FlushReport::default();
        // Too far out to represent means no deadline
        let deadline = Instant::now().checked_add(self.flush_deadline);
        let total = records.len();

        info!(
            "Submitting {} results via {} to {}",
            total,
            self.transport.name(),
            self.api_url
        );

        for (index, record) in records.into_iter().enumerate() {
            let url = self.result_url(&record.path);

            let body = match record.to_wire_body() {
                Ok(body) => body,
                Err(e) => {
                    error!("Failed to serialize result for {}: {}", url, e);
                    report.failures.push(SubmissionFailure {
                        url,
                        body: String::new(),
                        reason: FailureReason::Serialize(e.to_string()),
                    });
                    continue;
                }
            };

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                warn!("Flush deadline exceeded, not sending {}", url);
                report.failures.push(SubmissionFailure {
                    url,
                    body,
                    reason: FailureReason::DeadlineExceeded,
                });
                continue;
            }
            let timeout = match deadline {
                Some(deadline) => self.request_timeout.min(deadline - now),
                None => self.request_timeout,
            };

            debug!("[{}/{}] POST {}", index + 1, total, url);
            report.attempted += 1;

            let outcome = match tokio::time::timeout(
                timeout,
                self.transport.post_json(&url, &self.token, &body),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(SubmitError::Timeout(timeout)),
            };

            match outcome {
                Ok(200) => {
                    let view_url = self.view_url(record.path.project(), record.path.branch());
                    info!("Submitted {} (view at {})", record.path, view_url);
                    if !report.view_urls.contains(&view_url) {
                        report.view_urls.push(view_url);
                    }
                    report.succeeded += 1;
                }
                Ok(status) => {
                    error!("Collector returned {} for POST {} with body {}", status, url, body);
                    report.failures.push(SubmissionFailure {
                        url,
                        body,
                        reason: FailureReason::Status(status),
                    });
                }
                Err(e) => {
                    error!("POST {} failed: {} (body {})", url, e, body);
                    report.failures.push(SubmissionFailure {
                        url,
                        body,
                        reason: FailureReason::Transport(e.to_string()),
                    });
                }
            }
        }

        report
    }
}
