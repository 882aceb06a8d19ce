//! handlers/mod.rs
pub mod file_handler;
pub mod health_handler;
pub mod payment_handler;
