use tracing_subscriber::EnvFilter;

/// Console subscriber for the binary. `RUST_LOG` overrides the default
/// `info` level when set.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .compact()
        .init();
}
