use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::Database;

/// GET /api/health
pub async fn health_endpoint(db: web::Data<Database>) -> HttpResponse {
    let backend = db.backend().as_str();
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "database": backend
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(json!({
            "status": "unavailable",
            "database": backend,
            "error": format!("{:#}", e)
        })),
    }
}
