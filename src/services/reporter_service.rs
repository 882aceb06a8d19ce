use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::payment_model::{Payment, PaymentStatus};

pub const REPORT_PREFIX: &str = "Report ";

#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn create_report(&self, payments: &[Payment], file_name: &str) -> Result<PathBuf>;
}

/// Writes one text report per ingested file, split into success and error folders.
#[derive(Clone, Debug)]
pub struct ReporterService {
    success_dir: PathBuf,
    error_dir: PathBuf,
}

impl ReporterService {
    pub fn new(success_dir: impl Into<PathBuf>, error_dir: impl Into<PathBuf>) -> Self {
        ReporterService {
            success_dir: success_dir.into(),
            error_dir: error_dir.into(),
        }
    }

    /// Only a file whose every payment reached FULL_SAVED counts as a success.
    pub fn report_path(&self, payments: &[Payment], file_name: &str) -> PathBuf {
        let all_saved = payments
            .iter()
            .all(|p| p.status == PaymentStatus::FullSaved);
        let dir: &Path = if all_saved {
            &self.success_dir
        } else {
            &self.error_dir
        };
        dir.join(format!("{REPORT_PREFIX}{file_name}"))
    }
}

pub fn render_report(payments: &[Payment]) -> String {
    payments
        .iter()
        .map(|p| format!("{p}\n"))
        .collect()
}

#[async_trait]
impl ReportSink for ReporterService {
    async fn create_report(&self, payments: &[Payment], file_name: &str) -> Result<PathBuf> {
        log::info!("Creating report for {}", file_name);
        let output_path = self.report_path(payments, file_name);

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Could not create report directory {:?}", parent))?;
        }
        tokio::fs::write(&output_path, render_report(payments))
            .await
            .with_context(|| format!("Could not write report {:?}", output_path))?;

        log::info!("Report saved to {:?}", output_path);
        Ok(output_path)
    }
}
