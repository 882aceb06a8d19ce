use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::any::AnyRow;
use sqlx::{Any, Pool, Row};

use crate::models::amount::Amount;
use crate::models::payment_model::{
    NewPayment, Payment, PaymentFilter, PaymentPage, PaymentStatus,
};

pub const MAX_PAGE_SIZE: u64 = 100;

const PAYMENT_COLUMNS: &str = "id, payment_id, record_number, company_name, payer_inn, \
     amount, status_code, file_name, created_at";

/// Persistence seam used by the parser; tests swap in an in-memory store.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn payment_id_exists(&self, payment_id: &str) -> Result<bool>;
    async fn save_all(&self, payments: Vec<NewPayment>) -> Result<Vec<Payment>>;
}

#[derive(Clone, Debug)]
pub struct PaymentService {
    db_pool: Pool<Any>,
}

impl PaymentService {
    pub fn new(db_pool: Pool<Any>) -> Self {
        PaymentService { db_pool }
    }

    pub async fn save_payment(&self, payment: NewPayment) -> Result<Payment> {
        let created_at = Utc::now();
        let row = sqlx::query(INSERT_PAYMENT)
            .bind(payment.payment_id.clone())
            .bind(payment.record_number.clone())
            .bind(payment.company_name.clone())
            .bind(payment.payer_inn.clone())
            .bind(payment.amount.to_string())
            .bind(payment.status.code())
            .bind(payment.file_name.clone())
            .bind(created_at.to_rfc3339())
            .fetch_one(&self.db_pool)
            .await
            .context("Failed to insert payment")?;

        let id: i64 = row.try_get("id")?;
        Ok(into_payment(id, payment, created_at))
    }

    /// Builds a payment from its fields and stores it.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_payment(
        &self,
        payment_id: &str,
        record_number: &str,
        company_name: &str,
        payer_inn: &str,
        amount: Amount,
        status: PaymentStatus,
        file_name: &str,
    ) -> Result<Payment> {
        self.save_payment(NewPayment {
            payment_id: payment_id.to_string(),
            record_number: record_number.to_string(),
            company_name: company_name.to_string(),
            payer_inn: payer_inn.to_string(),
            amount,
            status,
            file_name: file_name.to_string(),
        })
        .await
    }

    /// Inserts every payment in one transaction; nothing is stored on failure.
    pub async fn save_all(&self, payments: Vec<NewPayment>) -> Result<Vec<Payment>> {
        let mut tx = self
            .db_pool
            .begin()
            .await
            .context("Failed to open transaction")?;
        let created_at = Utc::now();
        let mut saved = Vec::with_capacity(payments.len());

        for payment in payments {
            let row = sqlx::query(INSERT_PAYMENT)
                .bind(payment.payment_id.clone())
                .bind(payment.record_number.clone())
                .bind(payment.company_name.clone())
                .bind(payment.payer_inn.clone())
                .bind(payment.amount.to_string())
                .bind(payment.status.code())
                .bind(payment.file_name.clone())
                .bind(created_at.to_rfc3339())
                .fetch_one(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert payment {}", payment.payment_id))?;

            let id: i64 = row.try_get("id")?;
            saved.push(into_payment(id, payment, created_at));
        }

        tx.commit().await.context("Failed to commit payments")?;
        Ok(saved)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to load payment")?;

        row.map(|r| payment_from_row(&r)).transpose()
    }

    /// Earliest stored payment carrying this business id.
    pub async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1 ORDER BY id ASC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(payment_id.to_string())
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to load payment by payment_id")?;

        row.map(|r| payment_from_row(&r)).transpose()
    }

    /// Newest first. `page` is 1-based and `page_size` is clamped to 1..=100.
    pub async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: u64,
        page_size: u64,
    ) -> Result<PaymentPage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = page_offset(page, page_size);

        let mut conditions = Vec::new();
        if filter.status.is_some() {
            conditions.push(format!("status_code = ${}", conditions.len() + 1));
        }
        if filter.file_name.is_some() {
            conditions.push(format!("file_name = ${}", conditions.len() + 1));
        }
        let where_sql = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) AS cnt FROM payments {where_sql}");
        let mut count_query = sqlx::query(&count_sql);
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.code());
        }
        if let Some(file_name) = &filter.file_name {
            count_query = count_query.bind(file_name.clone());
        }
        let total: i64 = count_query
            .fetch_one(&self.db_pool)
            .await
            .context("Failed to count payments")?
            .try_get("cnt")?;

        let limit_idx = conditions.len() + 1;
        let list_sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments {where_sql} ORDER BY id DESC LIMIT ${} OFFSET ${}",
            limit_idx,
            limit_idx + 1
        );
        let mut list_query = sqlx::query(&list_sql);
        if let Some(status) = filter.status {
            list_query = list_query.bind(status.code());
        }
        if let Some(file_name) = &filter.file_name {
            list_query = list_query.bind(file_name.clone());
        }
        let rows = list_query
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(&self.db_pool)
            .await
            .context("Failed to list payments")?;

        let items = rows
            .iter()
            .map(payment_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(PaymentPage {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }
}

#[async_trait]
impl PaymentStore for PaymentService {
    async fn payment_id_exists(&self, payment_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT id FROM payments WHERE payment_id = $1 LIMIT 1")
            .bind(payment_id.to_string())
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to look up payment_id")?;
        Ok(row.is_some())
    }

    async fn save_all(&self, payments: Vec<NewPayment>) -> Result<Vec<Payment>> {
        PaymentService::save_all(self, payments).await
    }
}

/// Row offset of a 1-based page. Saturates at `i64::MAX`, the largest OFFSET the
/// databases accept.
pub fn page_offset(page: u64, page_size: u64) -> i64 {
    let offset = page.saturating_sub(1).saturating_mul(page_size);
    i64::try_from(offset).unwrap_or(i64::MAX)
}

const INSERT_PAYMENT: &str = r#"
    INSERT INTO payments (
        payment_id, record_number, company_name, payer_inn,
        amount, status_code, file_name, created_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING id
"#;

fn into_payment(id: i64, payment: NewPayment, created_at: chrono::DateTime<Utc>) -> Payment {
    Payment {
        id,
        payment_id: payment.payment_id,
        record_number: payment.record_number,
        company_name: payment.company_name,
        payer_inn: payment.payer_inn,
        amount: payment.amount,
        status: payment.status,
        status_code: payment.status.code(),
        file_name: payment.file_name,
        created_at,
    }
}

fn payment_from_row(row: &AnyRow) -> Result<Payment> {
    let status_code: i64 = row.try_get("status_code")?;
    let status = PaymentStatus::from_code(status_code)
        .ok_or_else(|| anyhow!("Unknown status code {status_code} in payments table"))?;
    let amount: String = row.try_get("amount")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Payment {
        id: row.try_get("id")?,
        payment_id: row.try_get("payment_id")?,
        record_number: row.try_get("record_number")?,
        company_name: row.try_get("company_name")?,
        payer_inn: row.try_get("payer_inn")?,
        amount: amount.parse()?,
        status,
        status_code,
        file_name: row.try_get("file_name")?,
        created_at: created_at.parse()?,
    })
}
