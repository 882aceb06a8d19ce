//! services/mod.rs
//! Business layer: parsing, persistence, reporting and directory watching.

pub mod ingest_log_service;
pub mod parser_service;
pub mod payment_service;
pub mod reporter_service;
pub mod watcher_service;
