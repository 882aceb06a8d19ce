use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use dotenv::dotenv;

use crate::config::app_config::AppConfig;
use crate::db::Database;
use crate::logger::init_logger;
use crate::services::ingest_log_service::IngestLogService;
use crate::services::parser_service::ParserService;
use crate::services::payment_service::PaymentService;
use crate::services::reporter_service::ReporterService;
use crate::services::watcher_service::DirectoryWatcher;

mod app;
mod config;
mod db;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;
mod validation;

#[cfg(test)]
mod tests;

fn prepare_directories(config: &AppConfig) -> Result<()> {
    for dir in [
        &config.input_directory,
        &config.report_success_dir,
        &config.report_error_dir,
    ] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Could not create directory {:?}", dir))?;
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logger();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    prepare_directories(&config)?;

    let db = Database::connect(&config).await?;
    db.run_migrations().await?;

    let payment_service = PaymentService::new(db.pool().clone());
    let ingest_log = IngestLogService::new(db.pool().clone());
    let reporter = ReporterService::new(&config.report_success_dir, &config.report_error_dir);
    let parser = ParserService::new(
        &config.input_directory,
        Arc::new(payment_service.clone()),
        Arc::new(reporter),
    );

    let watcher = DirectoryWatcher::new(parser, ingest_log.clone(), config.worker_count)
        .with_shutdown_grace(config.shutdown_grace);
    watcher.start(config.scan_interval).await?;

    log::info!(
        "Starting server on {}:{}",
        config.server_host,
        config.server_port
    );
    let server_watcher = watcher.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(ingest_log.clone()))
            .app_data(web::Data::new(server_watcher.clone()))
            .configure(app::init_app)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run();

    let result = server.await;
    watcher.shutdown().await;
    result.context("HTTP server failed")
}
