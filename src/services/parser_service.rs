use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::errors::FileProcessingError;
use crate::models::amount::Amount;
use crate::models::ingest_model::{FileOutcome, FileSummary};
use crate::models::payment_model::{NewPayment, PaymentStatus};
use crate::services::payment_service::PaymentStore;
use crate::services::reporter_service::ReportSink;
use crate::validation;

// Fixed-width columns, as char offsets.
const RECORD_NUMBER: (usize, usize) = (0, 12);
const PAYMENT_ID: (usize, usize) = (13, 63);
const COMPANY_NAME: (usize, usize) = (64, 129);
const PAYER_INN: (usize, usize) = (130, 142);
const AMOUNT_START: usize = 143;

/// Turns `BCP_*` files from the input directory into stored payments plus a report.
#[derive(Clone)]
pub struct ParserService {
    input_directory: PathBuf,
    store: Arc<dyn PaymentStore>,
    reporter: Arc<dyn ReportSink>,
    // Shared by clones: the stored-id check and the insert of one file must not
    // interleave with another file's.
    save_lock: Arc<Mutex<()>>,
}

impl ParserService {
    pub fn new(
        input_directory: impl Into<PathBuf>,
        store: Arc<dyn PaymentStore>,
        reporter: Arc<dyn ReportSink>,
    ) -> Self {
        ParserService {
            input_directory: input_directory.into(),
            store,
            reporter,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn input_directory(&self) -> &Path {
        &self.input_directory
    }

    pub fn is_valid_file_path(&self, path: &Path) -> bool {
        path.starts_with(&self.input_directory) && is_valid_file_name(path)
    }

    pub async fn parse_file(&self, path: &Path) -> Result<FileOutcome, FileProcessingError> {
        log::info!("Parsing file: {:?}", path);
        let file_name = file_name_of(path);

        if !self.is_valid_file_path(path) {
            log::warn!("Invalid file path or name: {:?}", path);
            return Ok(FileOutcome::Skipped { file_name });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| {
                log::error!("Error reading file {:?}: {}", path, source);
                FileProcessingError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        let store_err = |source: anyhow::Error| FileProcessingError::Store {
            file_name: file_name.clone(),
            source,
        };

        let mut summary = FileSummary {
            file_name: file_name.clone(),
            ..FileSummary::default()
        };
        let mut payments = Vec::new();
        let mut seen_ids = HashSet::new();

        for line in content.lines() {
            summary.total_lines += 1;
            log::debug!("Parsing line: {}", line);

            let Some(mut payment) = parse_line(line) else {
                summary.invalid_lines += 1;
                continue;
            };
            payment.file_name = file_name.clone();

            if !seen_ids.insert(payment.payment_id.clone()) {
                payment.status = PaymentStatus::Duplicate;
                log::info!(
                    "Payment with ID {} repeats in {}, status set to {}",
                    payment.payment_id,
                    file_name,
                    payment.status
                );
                summary.duplicates += 1;
            }
            payments.push(payment);
        }

        if payments.is_empty() {
            log::warn!("No valid payments to save or report in {}", file_name);
            return Ok(FileOutcome::Empty(summary));
        }

        let saved = {
            let _guard = self.save_lock.lock().await;
            for payment in payments
                .iter_mut()
                .filter(|p| p.status == PaymentStatus::Ok)
            {
                if self
                    .store
                    .payment_id_exists(&payment.payment_id)
                    .await
                    .map_err(store_err)?
                {
                    payment.status = PaymentStatus::Duplicate;
                    log::info!(
                        "Payment with ID {} is already stored, status set to {}",
                        payment.payment_id,
                        payment.status
                    );
                    summary.duplicates += 1;
                }
            }

            finalize_statuses(&mut payments, summary.invalid_lines > 0);
            self.store.save_all(payments).await.map_err(store_err)?
        };
        summary.saved = saved.len() as u64;

        match self.reporter.create_report(&saved, &file_name).await {
            Ok(path) => summary.report_path = Some(path),
            Err(e) => log::error!("Report for {} was not saved: {:#}", file_name, e),
        }

        log::info!(
            "Processed {}: {} saved, {} invalid, {} duplicates",
            file_name,
            summary.saved,
            summary.invalid_lines,
            summary.duplicates
        );
        Ok(FileOutcome::Processed(summary))
    }
}

pub fn is_valid_file_name(path: &Path) -> bool {
    let name = file_name_of(path);
    let valid = validation::is_valid_file_name(&name);
    log::info!(
        "File name: {} is {}",
        name,
        if valid { "valid" } else { "invalid" }
    );
    valid
}

/// Parses one fixed-width record; `None` when the line fails validation.
pub fn parse_line(raw: &str) -> Option<NewPayment> {
    let line = validation::clean_line(raw);
    if !validation::is_valid_line(&line) {
        log::error!("Line is invalid: {}", line);
        return None;
    }

    let chars: Vec<char> = line.chars().collect();
    let field = |(start, end): (usize, usize)| -> String {
        chars[start..end].iter().collect::<String>().trim().to_string()
    };
    let amount_raw: String = chars[AMOUNT_START..].iter().collect();

    let amount: Amount = match amount_raw.trim().parse() {
        Ok(amount) => amount,
        Err(e) => {
            log::error!("Error parsing line: {}", e);
            return None;
        }
    };

    let payment = NewPayment {
        record_number: field(RECORD_NUMBER),
        payment_id: field(PAYMENT_ID),
        company_name: field(COMPANY_NAME),
        payer_inn: field(PAYER_INN),
        amount,
        status: PaymentStatus::Ok,
        file_name: String::new(),
    };
    log::info!(
        "Parsed payment - Record: {}, ID: {}, Company: {}, PayerInn: {}, Amount: {}",
        payment.record_number,
        payment.payment_id,
        payment.company_name,
        payment.payer_inn,
        payment.amount
    );
    Some(payment)
}

/// With bad lines in the file only OK payments move, to PARTIAL_OK. A clean
/// file marks every payment FULL_SAVED, duplicates included.
pub fn finalize_statuses(payments: &mut [NewPayment], has_invalid_lines: bool) {
    if has_invalid_lines {
        for payment in payments
            .iter_mut()
            .filter(|p| p.status == PaymentStatus::Ok)
        {
            payment.status = PaymentStatus::PartialOk;
        }
    } else {
        for payment in payments.iter_mut() {
            payment.status = PaymentStatus::FullSaved;
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
