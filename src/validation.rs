//! validation.rs
//! Input constraints for payment files, record lines and API payloads.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::models::amount::Amount;
use crate::models::payment_model::{CreatePaymentRequest, PaymentStatus};

/// Valid record lines are 154 to 156 characters long.
pub const MIN_LINE_LEN: usize = 154;
pub const MAX_LINE_LEN: usize = 156;
pub const MAX_COMPANY_NAME_LEN: usize = 65;

const BYTE_ORDER_MARK: char = '\u{FEFF}';

lazy_static! {
    static ref FILE_NAME_RE: Regex = Regex::new(r"^BCP_\d{8}_\d{6}_\d{4}$").unwrap();
    static ref LINE_RE: Regex = Regex::new(
        r"^\d{12} \d{9}-\d{9}-\d{9}-\d{9}-\d{9,10} .{0,65} + \d{12} \d{1,19}\.\d{2}$"
    )
    .unwrap();
    static ref RECORD_NUMBER_RE: Regex = Regex::new(r"^\d{12}$").unwrap();
    static ref PAYMENT_ID_RE: Regex = Regex::new(r"^\d{9}-\d{9}-\d{9}-\d{9}-\d{9,10}$").unwrap();
    static ref PAYER_INN_RE: Regex = Regex::new(r"^(\d{10}|\d{12})$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("validation failed for {} field(s)", .0.len())]
pub struct ValidationError(pub Vec<FieldError>);

impl ValidationError {
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }
}

/// File names look like `BCP_20240131_235959_0001`, with no extension.
pub fn is_valid_file_name(file_name: &str) -> bool {
    FILE_NAME_RE.is_match(file_name)
}

/// Strips byte order marks anywhere in the line and surrounding whitespace.
pub fn clean_line(raw: &str) -> String {
    raw.replace(BYTE_ORDER_MARK, "").trim().to_string()
}

/// Expects an already cleaned line.
pub fn is_valid_line(line: &str) -> bool {
    let len = line.chars().count();
    (MIN_LINE_LEN..=MAX_LINE_LEN).contains(&len) && LINE_RE.is_match(line)
}

pub fn validate_new_payment(req: &CreatePaymentRequest) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    let mut push = |field: &'static str, message: &str| {
        errors.push(FieldError {
            field,
            message: message.to_string(),
        })
    };

    if !RECORD_NUMBER_RE.is_match(req.record_number.trim()) {
        push("record_number", "must be exactly 12 digits");
    }
    if !PAYMENT_ID_RE.is_match(req.payment_id.trim()) {
        push(
            "payment_id",
            "must be five dash-separated digit groups (9-9-9-9-9/10)",
        );
    }

    let company_len = req.company_name.trim().chars().count();
    if company_len == 0 {
        push("company_name", "must not be blank");
    } else if company_len > MAX_COMPANY_NAME_LEN {
        push("company_name", "must be at most 65 characters");
    }

    if !PAYER_INN_RE.is_match(req.payer_inn.trim()) {
        push("payer_inn", "must be 10 or 12 digits");
    }
    if req.amount.parse::<Amount>().is_err() {
        push("amount", "must be a decimal with exactly two fraction digits");
    }
    if let Some(status) = &req.status {
        if PaymentStatus::parse(status).is_none() {
            push("status", "unknown payment status");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError(errors))
    }
}
