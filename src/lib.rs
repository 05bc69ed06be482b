//! nyrkio-reporter: submits per-test durations from browser test runs to a
//! Nyrkiö collector.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **Framework**: Read test-runner reports into "test finished" events
//! - **Orchestrator**: Replay those events into reporters, one at a time
//! - **Report**: Accumulate one result record per test, console output
//! - **Path**: Derive each result's hierarchical path
//! - **Submit**: Post records to the collector after the run
//! - **Git**: Commit, commit date and branch shared by all records
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use nyrkio_reporter::config::load_config;
//! use nyrkio_reporter::framework::load_results;
//! use nyrkio_reporter::orchestrator::Orchestrator;
//! use nyrkio_reporter::report::{NyrkioReporter, RunContext};
//! use nyrkio_reporter::submit::{HttpTransport, Submitter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config(Path::new("nyrkio.toml"))?;
//!     let context = RunContext::resolve(&config, None).await?;
//!     let transport = HttpTransport::new(config.nyrkio.request_timeout())?;
//!     let submitter = Submitter::from_config(&config.nyrkio, std::env::var("NYRKIO_TOKEN")?, transport);
//!
//!     let events = load_results(Path::new("test-results/junit.xml"))?;
//!     let orchestrator = Orchestrator::new(NyrkioReporter::new(context, submitter));
//!     orchestrator.run(&events).await;
//!
//!     let report = orchestrator.reporter().take_flush_report().unwrap_or_default();
//!     println!("{} of {} results accepted", report.succeeded, report.total());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod framework;
pub mod git;
pub mod orchestrator;
pub mod path;
pub mod record;
pub mod report;
pub mod submit;

// Re-export commonly used types
pub use config::{Config, load_config};
pub use framework::{Suite, SuiteKind, TestCase, TestEvent, TestOutcome, TestResult};
pub use orchestrator::{Orchestrator, RunSummary};
pub use path::{ResultPath, build_path};
pub use record::ResultRecord;
pub use report::{NyrkioReporter, Reporter, RunContext};
pub use submit::{FlushReport, Submitter, Transport};
