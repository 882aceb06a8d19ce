//! config/mod.rs
//! Application settings loaded from the environment (and `.env`).

pub mod app_config;
