use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays valid JSON. `RUST_LOG` overrides the
/// `info` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
