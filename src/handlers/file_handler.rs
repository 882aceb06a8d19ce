//! handlers/file_handler.rs
//! Ingest log and on-demand directory scans.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::ingest_model::ScanResult;
use crate::services::ingest_log_service::IngestLogService;
use crate::services::watcher_service::DirectoryWatcher;

#[derive(Deserialize)]
pub struct PaginationQuery {
    page: Option<u64>,
    page_size: Option<u64>,
}

/// GET /api/files
pub async fn list_files_endpoint(
    ingest_log: web::Data<IngestLogService>,
    query: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10);

    match ingest_log.list(page, page_size).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Internal server error",
            "details": format!("{:#}", e)
        })),
    }
}

/// POST /api/files/scan
/// Runs one pass over the input directory without waiting for the next tick.
pub async fn scan_files_endpoint(watcher: web::Data<DirectoryWatcher>) -> HttpResponse {
    match watcher.process_pending().await {
        Ok(results) => {
            let items: Vec<ScanResult> = results
                .into_iter()
                .map(|(path, result)| {
                    let path = path.to_string_lossy().into_owned();
                    match result {
                        Ok(outcome) => ScanResult {
                            path,
                            outcome: Some(outcome),
                            error: None,
                        },
                        Err(e) => ScanResult {
                            path,
                            outcome: None,
                            error: Some(e.to_string()),
                        },
                    }
                })
                .collect();
            HttpResponse::Ok().json(json!({
                "scanned": items.len(),
                "items": items
            }))
        }
        Err(e) => {
            log::error!("Manual scan failed: {:#}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Scan failed",
                "details": format!("{:#}", e)
            }))
        }
    }
}
