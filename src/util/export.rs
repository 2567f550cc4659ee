//! Local export of already-fetched results as JSON or CSV downloads.
//!
//! Nothing here talks to the backend: a [`Download`] is the serialized file a
//! front end hands to the user (a browser blob, or a file the CLI writes).

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::net::types::{Finding, HistoryEntry};

pub const JSON_MIME: &str = "application/json";
pub const CSV_MIME: &str = "text/csv;charset=utf-8";

pub const FINDINGS_CSV_HEADER: [&str; 3] = ["Type", "Message", "Severity"];
pub const HISTORY_CSV_HEADER: [&str; 4] = ["ID", "Scan Type", "Timestamp", "Findings"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub mime: &'static str,
    pub body: String,
}

impl Download {
    /// Write the body to `dir/filename`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Write`] when the directory or file cannot be
    /// written.
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ExportError::Write { path: dir.to_path_buf(), source })?;
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.body)
            .await
            .map_err(|source| ExportError::Write { path: path.clone(), source })?;
        tracing::info!(path = %path.display(), bytes = self.body.len(), "export written");
        Ok(path)
    }
}

// =============================================================================
// ENCODERS
// =============================================================================

/// Two-space indented JSON.
///
/// # Errors
///
/// Returns [`ExportError::Serialize`] if the value cannot be serialized.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Quote a field only when it holds a comma, quote or line break; inner
/// quotes are doubled.
#[must_use]
pub fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Header line plus one line per row, joined with `\n`.
#[must_use]
pub fn to_csv<R, F>(header: &[&str], rows: R) -> String
where
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<str>,
{
    let mut lines = vec![header.iter().map(|h| csv_field(h)).collect::<Vec<_>>().join(",")];
    lines.extend(
        rows.into_iter()
            .map(|row| row.iter().map(|f| csv_field(f.as_ref()).into_owned()).collect::<Vec<_>>().join(",")),
    );
    lines.join("\n")
}

/// `Type,Message,Severity` rows, blank where a finding lacks the field.
#[must_use]
pub fn findings_csv(findings: &[Finding]) -> String {
    let rows = findings.iter().map(|f| {
        vec![
            f.kind.as_deref().unwrap_or_default(),
            f.message.as_deref().unwrap_or_default(),
            f.severity.as_deref().unwrap_or_default(),
        ]
    });
    to_csv(&FINDINGS_CSV_HEADER, rows)
}

#[must_use]
pub fn history_csv(entries: &[HistoryEntry]) -> String {
    let rows = entries.iter().map(|entry| {
        vec![
            entry.id.clone(),
            entry.scan_type.clone(),
            entry.timestamp.clone(),
            entry.findings_summary(),
        ]
    });
    to_csv(&HISTORY_CSV_HEADER, rows)
}

// =============================================================================
// DOWNLOADS
// =============================================================================

/// RFC 3339 instant with `:` replaced so it is safe in a filename.
#[must_use]
pub fn timestamp_slug(now: OffsetDateTime) -> String {
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
        .replace(':', "-")
}

fn unix_millis(now: OffsetDateTime) -> i128 {
    now.unix_timestamp_nanos() / 1_000_000
}

/// Raw CSPM results as `cspm_scan_<timestamp>.json`.
///
/// # Errors
///
/// Returns [`ExportError::Serialize`] if the value cannot be serialized.
pub fn cspm_json(results: &Value, now: OffsetDateTime) -> Result<Download, ExportError> {
    Ok(Download {
        filename: format!("cspm_scan_{}.json", timestamp_slug(now)),
        mime: JSON_MIME,
        body: to_pretty_json(results)?,
    })
}

/// CWPP findings as `cwpp_scan_<millis>.csv`.
#[must_use]
pub fn cwpp_csv(findings: &[Finding], now: OffsetDateTime) -> Download {
    Download {
        filename: format!("cwpp_scan_{}.csv", unix_millis(now)),
        mime: CSV_MIME,
        body: findings_csv(findings),
    }
}

/// Raw history rows as `scan_history.json`.
///
/// # Errors
///
/// Returns [`ExportError::Serialize`] if the rows cannot be serialized.
pub fn history_json(rows: &[Value]) -> Result<Download, ExportError> {
    Ok(Download { filename: "scan_history.json".to_owned(), mime: JSON_MIME, body: to_pretty_json(rows)? })
}

#[must_use]
pub fn history_csv_download(entries: &[HistoryEntry]) -> Download {
    Download { filename: "scan_history.csv".to_owned(), mime: CSV_MIME, body: history_csv(entries) }
}
