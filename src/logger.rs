use tracing::info;
use tracing_subscriber::{prelude::*, fmt, EnvFilter};

// Default level when "RUST_LOG" is not set
const DEFAULT_LEVEL: &str = if cfg!(debug_assertions) { "debug" } else { "info" };

pub fn init_logging() {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(f) => (f, true),
        Err(_) => (EnvFilter::new(DEFAULT_LEVEL), false),
    };

    let fmt_layer = fmt::layer();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    if !from_env {
        info!("\"RUST_LOG\" variable not set, defaulting to {DEFAULT_LEVEL}");
    }
}
