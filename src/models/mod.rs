//! models/mod.rs
//! Shared records and request/response shapes.

pub mod amount;
pub mod ingest_model;
pub mod payment_model;
