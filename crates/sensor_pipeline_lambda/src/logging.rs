use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info";

/// JSON lines on stdout for CloudWatch. CloudWatch stamps each line itself,
/// so the formatter omits timestamps.
pub fn init_tracing(function: &'static str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let initialized = fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .with_current_span(false)
        .with_ansi(false)
        .without_time()
        .try_init();

    if let Err(error) = initialized {
        eprintln!("tracing subscriber already initialized: {error}");
        return;
    }
    tracing::info!(function, "logging_initialized");
}
