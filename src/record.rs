//! Result records and their wire format.
//!
//! A [`ResultRecord`] holds one measurement for one test. The collector
//! accepts records in batches, so the request body wraps a single record in
//! a one-element JSON array:
//!
//! ```json
//! [{
//!   "timestamp": 1705276800,
//!   "metrics": [{"name": "test duration", "unit": "msec", "value": 842}],
//!   "attributes": {"git_repo": "https://github.com/org/app", "branch": "main", "git_commit": "abc123"}
//! }]
//! ```
//!
//! The record's path is not part of the body; it is carried in the URL.

use serde::{Deserialize, Serialize, Serializer};

use crate::path::ResultPath;

/// Name of the single metric reported per test.
pub const DURATION_METRIC: &str = "test duration";

/// Unit of [`DURATION_METRIC`].
pub const DURATION_UNIT: &str = "msec";

/// A named measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub unit: String,
    #[serde(serialize_with = "serialize_number")]
    pub value: f64,
}

impl Metric {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            value,
        }
    }

    /// The per-test duration metric.
    pub fn duration_ms(value: f64) -> Self {
        Self::new(DURATION_METRIC, DURATION_UNIT, value)
    }
}

/// Integral values go out as JSON integers (`842`, not `842.0`).
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Source-control attribution attached to every record of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub git_repo: String,
    pub branch: String,
    pub git_commit: String,
}

/// One measurement for one test.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Commit date of the checkout, seconds since the epoch.
    pub timestamp: i64,
    /// Never empty.
    pub metrics: Vec<Metric>,
    pub attributes: Attributes,
    pub path: ResultPath,
}

/// Body shape of a single record as the collector expects it.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireRecord {
    pub timestamp: i64,
    pub metrics: Vec<Metric>,
    pub attributes: Attributes,
}

impl ResultRecord {
    pub fn to_wire(&self) -> WireRecord {
        WireRecord {
            timestamp: self.timestamp,
            metrics: self.metrics.clone(),
            attributes: self.attributes.clone(),
        }
    }

    /// Serializes the record as a one-element JSON array.
    pub fn to_wire_body(&self) -> serde_json::Result<String> {
        serde_json::to_string(&[self.to_wire()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::TestCase;
    use crate::path::build_path;

    fn record(value: f64) -> ResultRecord {
        ResultRecord {
            timestamp: 1705276800,
            metrics: vec![Metric::duration_ms(value)],
            attributes: Attributes {
                git_repo: "https://example.com/repo".to_string(),
                branch: "main".to_string(),
                git_commit: "abc123".to_string(),
            },
            path: build_path("P", "main", &TestCase::new("t")),
        }
    }

    #[test]
    fn test_wire_body_exact() {
        let body = record(842.0).to_wire_body().unwrap();
        assert_eq!(
            body,
            r#"[{"timestamp":1705276800,"metrics":[{"name":"test duration","unit":"msec","value":842}],"attributes":{"git_repo":"https://example.com/repo","branch":"main","git_commit":"abc123"}}]"#
        );
    }

    #[test]
    fn test_fractional_value_kept() {
        let body = record(12.5).to_wire_body().unwrap();
        assert!(body.contains(r#""value":12.5"#));
    }

    #[test]
    fn test_wire_body_parses_back() {
        let body = record(842.0).to_wire_body().unwrap();
        let parsed: Vec<WireRecord> = serde_json::from_str(&body).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].metrics.len(), 1);
        assert_eq!(parsed[0].metrics[0].name, "test duration");
        assert_eq!(parsed[0].metrics[0].unit, "msec");
        assert_eq!(parsed[0].metrics[0].value, 842.0);
        assert_eq!(parsed[0].attributes.git_commit, "abc123");
    }
}
