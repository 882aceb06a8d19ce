//! handlers/payment_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::amount::Amount;
use crate::models::payment_model::{CreatePaymentRequest, PaymentFilter, PaymentStatus};
use crate::services::payment_service::PaymentService;
use crate::validation::validate_new_payment;

#[derive(Deserialize)]
pub struct PaymentListQuery {
    page: Option<u64>,
    page_size: Option<u64>,
    status: Option<String>,
    file_name: Option<String>,
}

/// GET /api/payments
pub async fn list_payments_endpoint(
    payment_service: web::Data<PaymentService>,
    query: web::Query<PaymentListQuery>,
) -> HttpResponse {
    let query = query.into_inner();
    let parsed_status = query.status.as_deref().map(PaymentStatus::parse);
    let status = match parsed_status {
        None => None,
        Some(Some(status)) => Some(status),
        Some(None) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Invalid status filter",
                "details": query.status
            }))
        }
    };
    let filter = PaymentFilter {
        status,
        file_name: query.file_name,
    };

    match payment_service
        .list_payments(&filter, query.page.unwrap_or(1), query.page_size.unwrap_or(10))
        .await
    {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => internal_error(e),
    }
}

/// GET /api/payments/{id}
pub async fn get_payment_endpoint(
    payment_service: web::Data<PaymentService>,
    path: web::Path<i64>,
) -> HttpResponse {
    let id = path.into_inner();

    match payment_service.find_by_id(id).await {
        Ok(Some(payment)) => HttpResponse::Ok().json(payment),
        Ok(None) => not_found(format!("No payment with id {id}")),
        Err(e) => internal_error(e),
    }
}

/// GET /api/payments/by-payment-id/{payment_id}
pub async fn get_payment_by_payment_id_endpoint(
    payment_service: web::Data<PaymentService>,
    path: web::Path<String>,
) -> HttpResponse {
    let payment_id = path.into_inner();

    match payment_service.find_by_payment_id(&payment_id).await {
        Ok(Some(payment)) => HttpResponse::Ok().json(payment),
        Ok(None) => not_found(format!("No payment with payment_id {payment_id}")),
        Err(e) => internal_error(e),
    }
}

/// POST /api/payments
pub async fn create_payment_endpoint(
    payment_service: web::Data<PaymentService>,
    body: web::Json<CreatePaymentRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    if let Err(e) = validate_new_payment(&req) {
        return HttpResponse::BadRequest().json(json!({
            "error": e.to_string(),
            "details": e.fields()
        }));
    }

    // Both already validated above.
    let (Ok(amount), Some(status)) = (
        req.amount.trim().parse::<Amount>(),
        req.status
            .as_deref()
            .map_or(Some(PaymentStatus::Ok), PaymentStatus::parse),
    ) else {
        return HttpResponse::BadRequest().json(json!({ "error": "Invalid payment" }));
    };

    match payment_service
        .create_payment(
            req.payment_id.trim(),
            req.record_number.trim(),
            req.company_name.trim(),
            req.payer_inn.trim(),
            amount,
            status,
            req.file_name.as_deref().unwrap_or_default(),
        )
        .await
    {
        Ok(payment) => {
            log::info!("Created payment {} via API", payment.payment_id);
            HttpResponse::Created().json(payment)
        }
        Err(e) => internal_error(e),
    }
}

fn not_found(details: String) -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "error": "Payment not found",
        "details": details
    }))
}

fn internal_error(e: anyhow::Error) -> HttpResponse {
    log::error!("Payment request failed: {:#}", e);
    HttpResponse::InternalServerError().json(json!({
        "error": "Internal server error",
        "details": format!("{:#}", e)
    }))
}
