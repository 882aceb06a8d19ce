//! models/payment_model.rs
//! Payment records and the API shapes built on them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::amount::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Ok,
    FullSaved,
    Duplicate,
    PartialOk,
    NotOk,
}

impl PaymentStatus {
    pub fn code(&self) -> i64 {
        match self {
            PaymentStatus::Ok => 1,
            PaymentStatus::FullSaved => 2,
            PaymentStatus::Duplicate => 97,
            PaymentStatus::PartialOk => 98,
            PaymentStatus::NotOk => 99,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(PaymentStatus::Ok),
            2 => Some(PaymentStatus::FullSaved),
            97 => Some(PaymentStatus::Duplicate),
            98 => Some(PaymentStatus::PartialOk),
            99 => Some(PaymentStatus::NotOk),
            _ => None,
        }
    }

    /// Accepts either the name (`FULL_SAVED`) or the numeric code (`2`).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(code) = raw.parse::<i64>() {
            return Self::from_code(code);
        }
        match raw.to_ascii_uppercase().as_str() {
            "OK" => Some(PaymentStatus::Ok),
            "FULL_SAVED" => Some(PaymentStatus::FullSaved),
            "DUPLICATE" => Some(PaymentStatus::Duplicate),
            "PARTIAL_OK" => Some(PaymentStatus::PartialOk),
            "NOT_OK" => Some(PaymentStatus::NotOk),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaymentStatus::Ok => "OK",
            PaymentStatus::FullSaved => "FULL_SAVED",
            PaymentStatus::Duplicate => "DUPLICATE",
            PaymentStatus::PartialOk => "PARTIAL_OK",
            PaymentStatus::NotOk => "NOT_OK",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

/// A payment that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub payment_id: String,
    pub record_number: String,
    pub company_name: String,
    pub payer_inn: String,
    pub amount: Amount,
    pub status: PaymentStatus,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: i64,
    pub payment_id: String,
    pub record_number: String,
    pub company_name: String,
    pub payer_inn: String,
    pub amount: Amount,
    pub status: PaymentStatus,
    pub status_code: i64,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Payment {
    /// One report line; the status is written as its numeric code.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Payment{{id={}, paymentId='{}', recordNumber='{}', companyName='{}', payerInn='{}', amount={}, status={}}}",
            self.id,
            self.payment_id,
            self.record_number,
            self.company_name,
            self.payer_inn,
            self.amount,
            self.status_code,
        )
    }
}

/// Body of `POST /api/payments`. Fields are validated before use.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub record_number: String,
    pub payment_id: String,
    pub company_name: String,
    pub payer_inn: String,
    pub amount: String,
    pub status: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentPage {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<Payment>,
}
