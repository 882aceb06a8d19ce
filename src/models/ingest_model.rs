use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one processed input file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file_name: String,
    pub total_lines: u64,
    pub saved: u64,
    pub invalid_lines: u64,
    pub duplicates: u64,
    pub report_path: Option<PathBuf>,
}

/// What happened to a file handed to the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Outside the input directory or not a `BCP_` file name.
    Skipped { file_name: String },
    /// Readable, but no line produced a payment.
    Empty(FileSummary),
    Processed(FileSummary),
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestedFileRecord {
    pub id: i64,
    pub file_name: String,
    pub status: String, // "processed", "empty", "failed"
    pub total_lines: i64,
    pub saved: i64,
    pub invalid_lines: i64,
    pub duplicates: i64,
    pub report_path: Option<String>,
    pub error_message: Option<String>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListIngestedFilesResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<IngestedFileRecord>,
}

/// Result line for one file in a `POST /api/files/scan` response.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub path: String,
    pub outcome: Option<FileOutcome>,
    pub error: Option<String>,
}
