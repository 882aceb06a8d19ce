//! Fakes and fixtures shared by the test modules.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::models::payment_model::{NewPayment, Payment, PaymentStatus};
use crate::services::payment_service::PaymentStore;
use crate::services::reporter_service::ReportSink;

pub const VALID_FILE_NAME: &str = "BCP_20230101_120000_0001";
pub const PAYMENT_ID: &str = "123456789-123456789-123456789-123456789-1234567890";

/// Builds a fixed-width record line; with a 12 char amount it is 155 chars long.
pub fn payment_line(record: &str, payment_id: &str, company: &str, inn: &str, amount: &str) -> String {
    format!("{record} {payment_id:<50} {company:<65} {inn} {amount}")
}

/// A valid line whose payment id ends in `suffix` (up to 10 digits).
pub fn valid_line(suffix: u64) -> String {
    let payment_id = format!("123456789-123456789-123456789-123456789-{suffix:010}");
    payment_line(
        &format!("{suffix:012}"),
        &payment_id,
        "ACME Corp",
        "123456789012",
        "000001000.00",
    )
}

#[derive(Default)]
pub struct FakeStore {
    pub existing_ids: Mutex<HashSet<String>>,
    pub saved: Mutex<Vec<Payment>>,
    pub save_calls: Mutex<usize>,
}

impl FakeStore {
    pub fn with_existing(ids: &[&str]) -> Self {
        let store = FakeStore::default();
        store
            .existing_ids
            .lock()
            .unwrap()
            .extend(ids.iter().map(|s| s.to_string()));
        store
    }

    pub fn saved_statuses(&self) -> Vec<PaymentStatus> {
        self.saved.lock().unwrap().iter().map(|p| p.status).collect()
    }
}

#[async_trait]
impl PaymentStore for FakeStore {
    async fn payment_id_exists(&self, payment_id: &str) -> Result<bool> {
        Ok(self.existing_ids.lock().unwrap().contains(payment_id))
    }

    async fn save_all(&self, payments: Vec<NewPayment>) -> Result<Vec<Payment>> {
        *self.save_calls.lock().unwrap() += 1;
        let mut saved = self.saved.lock().unwrap();
        let mut out = Vec::new();
        for p in payments {
            let payment = Payment {
                id: saved.len() as i64 + 1,
                status_code: p.status.code(),
                payment_id: p.payment_id,
                record_number: p.record_number,
                company_name: p.company_name,
                payer_inn: p.payer_inn,
                amount: p.amount,
                status: p.status,
                file_name: p.file_name,
                created_at: Utc::now(),
            };
            saved.push(payment.clone());
            out.push(payment);
        }
        Ok(out)
    }
}

#[derive(Default)]
pub struct FakeReporter {
    pub reports: Mutex<Vec<(String, Vec<PaymentStatus>)>>,
}

impl FakeReporter {
    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

#[async_trait]
impl ReportSink for FakeReporter {
    async fn create_report(&self, payments: &[Payment], file_name: &str) -> Result<PathBuf> {
        self.reports.lock().unwrap().push((
            file_name.to_string(),
            payments.iter().map(|p| p.status).collect(),
        ));
        Ok(PathBuf::from(format!("reports/Report {file_name}")))
    }
}

/// Report sink that takes `delay` per report and tracks how many run at once.
pub struct SlowReporter {
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicUsize,
}

impl SlowReporter {
    pub fn new(delay: Duration) -> Self {
        SlowReporter {
            delay,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportSink for SlowReporter {
    async fn create_report(&self, _payments: &[Payment], file_name: &str) -> Result<PathBuf> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(PathBuf::from(format!("reports/Report {file_name}")))
    }
}
