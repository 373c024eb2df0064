//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Picks the filter directive: `-v` raises the configured level, `RUST_LOG` wins over both.
pub fn filter_directive(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "regproxy=debug,libregproxy=debug,tower_http=debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Installs the global `fmt` subscriber.
pub fn init(configured: &str, verbose: u8) {
    let directive = filter_directive(configured, verbose);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| directive.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
