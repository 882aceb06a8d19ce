use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::any::AnyRow;
use sqlx::{Any, Pool, Row};

use crate::models::ingest_model::{
    FileOutcome, FileSummary, IngestedFileRecord, ListIngestedFilesResponse,
};
use crate::services::payment_service::{page_offset, MAX_PAGE_SIZE};

pub const STATUS_PROCESSED: &str = "processed";
pub const STATUS_EMPTY: &str = "empty";
pub const STATUS_FAILED: &str = "failed";

/// Audit trail of input files, also used to skip files across restarts.
#[derive(Clone, Debug)]
pub struct IngestLogService {
    db_pool: Pool<Any>,
}

impl IngestLogService {
    pub fn new(db_pool: Pool<Any>) -> Self {
        IngestLogService { db_pool }
    }

    /// Skipped files are not persisted; they are rejected again cheaply on restart.
    pub async fn record(&self, outcome: &FileOutcome) -> Result<()> {
        match outcome {
            FileOutcome::Skipped { .. } => Ok(()),
            FileOutcome::Empty(summary) => self.insert(summary, STATUS_EMPTY, None).await,
            FileOutcome::Processed(summary) => {
                self.insert(summary, STATUS_PROCESSED, None).await
            }
        }
    }

    pub async fn record_failure(&self, file_name: &str, error: &str) -> Result<()> {
        let summary = FileSummary {
            file_name: file_name.to_string(),
            ..FileSummary::default()
        };
        self.insert(&summary, STATUS_FAILED, Some(error)).await
    }

    async fn insert(&self, summary: &FileSummary, status: &str, error: Option<&str>) -> Result<()> {
        let report_path = summary
            .report_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        sqlx::query(
            r#"
            INSERT INTO ingested_files (
                file_name, status, total_lines, saved, invalid_lines,
                duplicates, report_path, error_message, processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(summary.file_name.clone())
        .bind(status.to_string())
        .bind(summary.total_lines as i64)
        .bind(summary.saved as i64)
        .bind(summary.invalid_lines as i64)
        .bind(summary.duplicates as i64)
        .bind(report_path)
        .bind(error.map(str::to_string))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Failed to insert ingested_files row")?;

        Ok(())
    }

    /// Names of files that reached a terminal state.
    pub async fn processed_names(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT DISTINCT file_name FROM ingested_files")
            .fetch_all(&self.db_pool)
            .await
            .context("Failed to load ingested file names")?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("file_name").map_err(Into::into))
            .collect()
    }

    pub async fn list(&self, page: u64, page_size: u64) -> Result<ListIngestedFilesResponse> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = page_offset(page, page_size);

        let total: i64 = sqlx::query("SELECT COUNT(*) AS cnt FROM ingested_files")
            .fetch_one(&self.db_pool)
            .await?
            .try_get("cnt")?;

        let rows = sqlx::query(
            r#"
            SELECT id, file_name, status, total_lines, saved, invalid_lines,
                   duplicates, report_path, error_message, processed_at
            FROM ingested_files
            ORDER BY id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await
        .context("Failed to list ingested files")?;

        let items = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(ListIngestedFilesResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }
}

fn record_from_row(row: &AnyRow) -> Result<IngestedFileRecord> {
    let processed_at: String = row.try_get("processed_at")?;
    Ok(IngestedFileRecord {
        id: row.try_get("id")?,
        file_name: row.try_get("file_name")?,
        status: row.try_get("status")?,
        total_lines: row.try_get("total_lines")?,
        saved: row.try_get("saved")?,
        invalid_lines: row.try_get("invalid_lines")?,
        duplicates: row.try_get("duplicates")?,
        report_path: row.try_get("report_path")?,
        error_message: row.try_get("error_message")?,
        processed_at: processed_at.parse()?,
    })
}
