//! logger.rs
//! env_logger setup; `RUST_LOG` wins over the default level.

pub fn init_logger() {
    let log_env = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sqlx=warn".to_string());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_env))
        .format_timestamp_secs()
        .init();
}
