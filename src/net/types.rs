//! Backend wire DTOs and the read-only report views derived from them.
//!
//! DESIGN
//! ======
//! The backend answers with a loose `{status, error?, data?/results?/history?}`
//! envelope and untyped result trees. Every envelope here deserializes with
//! all fields optional and defaulted, so one malformed field never fails a
//! whole response. Scan result trees stay as raw `serde_json::Value` (export
//! must be lossless); the `*Report` views read them through one canonical set
//! of optional paths instead of per-call-site guessing.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const STATUS_OK: &str = "ok";

// =============================================================================
// LENIENT FIELD DECODING
// =============================================================================

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(&Value::deserialize(deserializer)?))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_vec<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

/// Text of a scalar JSON value; `None` for null, empty strings and containers.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(value_text)
}

fn is_ok_status(status: Option<&str>) -> bool {
    status == Some(STATUS_OK)
}

// =============================================================================
// ENVELOPES
// =============================================================================

/// Plain `{status, error?, message?, detail?}` acknowledgement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub detail: Option<String>,
}

impl StatusResponse {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        is_ok_status(self.status.as_deref())
    }
}

/// `GET /dashboard/stats`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_scans: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub critical_findings: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub medium_findings: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub low_findings: u64,
    #[serde(default, deserialize_with = "lenient_trend")]
    pub trend: Vec<TrendPoint>,
}

impl DashboardStats {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        is_ok_status(self.status.as_deref())
    }
}

/// Scans per day for the trend chart.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub scans: u64,
}

fn lenient_trend<'de, D>(deserializer: D) -> Result<Vec<TrendPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_vec(deserializer)?
        .into_iter()
        .filter_map(|point| serde_json::from_value(point).ok())
        .collect())
}

/// `GET /scan/cspm`, `/scan/cspm-multi`, `/scan/cwpp`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    /// Raw service-keyed result tree; `None` when absent or null.
    #[serde(default)]
    pub results: Option<Value>,
}

impl ScanResponse {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        is_ok_status(self.status.as_deref())
    }
}

/// `GET /results/history[-multi]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(default)]
    pub history: Value,
}

impl HistoryResponse {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        is_ok_status(self.status.as_deref())
    }

    /// Raw history rows, or `None` when `history` is not an array.
    #[must_use]
    pub fn into_entries(self) -> Option<Vec<Value>> {
        match self.history {
            Value::Array(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Cross-account trust target the backend scans through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsAccount {
    #[serde(default, deserialize_with = "lenient_string")]
    pub account_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role_arn: Option<String>,
    /// Whether the backend could assume the role just now.
    #[serde(default)]
    pub is_valid: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub validation_error: Option<String>,
}

/// `GET /aws-account`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsAccountResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<AwsAccount>,
}

impl AwsAccountResponse {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        is_ok_status(self.status.as_deref())
    }
}

/// Body of `POST /aws-account`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AwsAccountRequest<'a> {
    pub account_id: &'a str,
    pub role_arn: &'a str,
}

/// `GET /policy/violations`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationsResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub violations: Vec<Value>,
}

/// Body of `POST /contact`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

// =============================================================================
// FINDINGS
// =============================================================================

/// One finding inside a scan result. Field names vary by scanner, so every
/// field is optional and the accessors apply the display fallbacks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default, deserialize_with = "lenient_string")]
    pub issue: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub resource: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub severity: Option<String>,
}

impl Finding {
    /// Decode one finding; non-objects yield an empty finding.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// `issue`, else `type`, else `Unknown`.
    #[must_use]
    pub fn label(&self) -> &str {
        self.issue.as_deref().or(self.kind.as_deref()).unwrap_or("Unknown")
    }

    /// `message`, else `resource`, else an em dash.
    #[must_use]
    pub fn detail(&self) -> &str {
        self.message.as_deref().or(self.resource.as_deref()).unwrap_or("\u{2014}")
    }

    #[must_use]
    pub fn severity_label(&self) -> &str {
        self.severity.as_deref().unwrap_or("N/A")
    }

    /// `label: detail (severity)` as shown in history rows.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{}: {} ({})", self.label(), self.detail(), self.severity_label())
    }
}

/// Findings under `root.findings` plus every `root.<service>.findings`.
#[must_use]
pub fn collect_findings(root: &Value) -> Vec<Finding> {
    let mut findings: Vec<Finding> = root
        .get("findings")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(Finding::from_value).collect())
        .unwrap_or_default();

    if let Some(services) = root.as_object() {
        for block in services.values() {
            if let Some(items) = block.as_object().and_then(|o| o.get("findings")).and_then(Value::as_array) {
                findings.extend(items.iter().map(Finding::from_value));
            }
        }
    }
    findings
}

/// Finding totals bucketed the way the backend normalizes severities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub unrated: usize,
}

impl SeverityCounts {
    #[must_use]
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity.as_deref().map(str::to_ascii_lowercase).as_deref() {
                Some("critical" | "high") => counts.high += 1,
                Some("medium") => counts.medium += 1,
                Some("low") => counts.low += 1,
                Some(_) => counts.info += 1,
                None => counts.unrated += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low + self.info + self.unrated
    }
}

// =============================================================================
// CSPM REPORT
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ec2Instance {
    pub instance_id: Option<String>,
    pub instance_type: Option<String>,
    pub launch_time: Option<String>,
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct S3Bucket {
    pub name: Option<String>,
    pub creation_date: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IamUser {
    pub user_name: Option<String>,
    pub user_id: Option<String>,
    pub create_date: Option<String>,
}

/// Posture scan view over `ec2.ec2_instances.Reservations[].Instances[]`,
/// `s3.s3_buckets[]` and `iam.Users[]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CspmReport {
    pub instances: Vec<Ec2Instance>,
    pub buckets: Vec<S3Bucket>,
    pub iam_users: Vec<IamUser>,
    pub findings: Vec<Finding>,
}

fn array_at<'a>(root: &'a Value, path: &[&str]) -> &'a [Value] {
    let mut node = root;
    for key in path {
        match node.get(key) {
            Some(next) => node = next,
            None => return &[],
        }
    }
    match node.as_array() {
        Some(items) => items,
        None => &[],
    }
}

impl CspmReport {
    #[must_use]
    pub fn from_results(results: &Value) -> Self {
        let instances = array_at(results, &["ec2", "ec2_instances", "Reservations"])
            .iter()
            .flat_map(|reservation| array_at(reservation, &["Instances"]))
            .map(|inst| Ec2Instance {
                instance_id: field_text(inst, "InstanceId"),
                instance_type: field_text(inst, "InstanceType"),
                launch_time: field_text(inst, "LaunchTime"),
                state: inst.get("State").and_then(|s| field_text(s, "Name")),
            })
            .collect();

        let buckets = array_at(results, &["s3", "s3_buckets"])
            .iter()
            .map(|bucket| S3Bucket {
                name: field_text(bucket, "Name"),
                creation_date: field_text(bucket, "CreationDate"),
            })
            .collect();

        let iam_users = array_at(results, &["iam", "Users"])
            .iter()
            .map(|user| IamUser {
                user_name: field_text(user, "UserName"),
                user_id: field_text(user, "UserId"),
                create_date: field_text(user, "CreateDate"),
            })
            .collect();

        Self { instances, buckets, iam_users, findings: collect_findings(results) }
    }
}

// =============================================================================
// CWPP REPORT
// =============================================================================

/// Workload scan view over `results.{scan_type, timestamp, findings[]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CwppReport {
    pub scan_type: Option<String>,
    pub timestamp: Option<String>,
    pub findings: Vec<Finding>,
    pub severity: SeverityCounts,
}

impl CwppReport {
    #[must_use]
    pub fn from_results(results: &Value) -> Self {
        let findings: Vec<Finding> = array_at(results, &["findings"]).iter().map(Finding::from_value).collect();
        let severity = SeverityCounts::tally(&findings);
        Self {
            scan_type: field_text(results, "scan_type"),
            timestamp: field_text(results, "timestamp"),
            findings,
            severity,
        }
    }

    /// Scan type upper-cased for headings (`CWPP`), empty when unknown.
    #[must_use]
    pub fn scan_type_label(&self) -> String {
        self.scan_type.as_deref().unwrap_or_default().to_uppercase()
    }
}

// =============================================================================
// HISTORY
// =============================================================================

/// Display view of one stored scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Server-assigned id; numeric ids are rendered as text.
    pub id: String,
    pub scan_type: String,
    pub timestamp: String,
    pub findings: Vec<Finding>,
}

impl HistoryEntry {
    #[must_use]
    pub fn from_value(row: &Value) -> Self {
        let data = row.get("data").filter(|d| !d.is_null());
        let nested = data.and_then(|d| d.get("results")).filter(|r| !r.is_null());
        let root = nested.or(data).unwrap_or(&Value::Null);

        let scan_type = data
            .and_then(|d| field_text(d, "scan_type"))
            .or_else(|| nested.and_then(|r| field_text(r, "scan_type")))
            .unwrap_or_else(|| "Unknown".to_owned());
        let timestamp = data
            .and_then(|d| field_text(d, "timestamp"))
            .or_else(|| field_text(row, "timestamp"))
            .unwrap_or_else(|| "N/A".to_owned());

        Self {
            id: field_text(row, "id").unwrap_or_default(),
            scan_type,
            timestamp,
            findings: collect_findings(root),
        }
    }

    /// Findings joined for a single CSV cell, or `No findings`.
    #[must_use]
    pub fn findings_summary(&self) -> String {
        if self.findings.is_empty() {
            return "No findings".to_owned();
        }
        self.findings.iter().map(Finding::summary).collect::<Vec<_>>().join(" | ")
    }
}
