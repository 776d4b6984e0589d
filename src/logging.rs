use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sets up the logging subscriber for the service.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at INFO and above.
/// Rejected event bodies are logged at DEBUG, so enable
/// `RUST_LOG=monitor_api=debug` to see them.
pub fn init_logger() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("monitor_api={},tower_http={}", Level::INFO, Level::INFO)));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_ansi(true)
        .compact();

    // A subscriber may already be installed by an embedding process.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
