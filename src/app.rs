//! app.rs
use crate::handlers::{file_handler, health_handler, payment_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_handler::health_endpoint))
            .service(
                web::scope("/payments")
                    .route("", web::get().to(payment_handler::list_payments_endpoint))
                    .route("", web::post().to(payment_handler::create_payment_endpoint))
                    .route(
                        "/by-payment-id/{payment_id}",
                        web::get().to(payment_handler::get_payment_by_payment_id_endpoint),
                    )
                    .route(
                        "/{id}",
                        web::get().to(payment_handler::get_payment_endpoint),
                    ),
            )
            .service(
                web::scope("/files")
                    .route("", web::get().to(file_handler::list_files_endpoint))
                    .route("/scan", web::post().to(file_handler::scan_files_endpoint)),
            ),
    );
}
