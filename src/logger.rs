use std::env;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries the IPC responses.
pub fn init_logging() {
    let filter = match env::var("STUDYD_LOG").or_else(|_| env::var("RUST_LOG")) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new("warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
