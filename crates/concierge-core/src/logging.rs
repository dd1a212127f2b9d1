//! Tracing subscriber setup.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global tracing subscriber.
///
/// Respects `RUST_LOG`, defaulting to the given level. Safe to call more
/// than once; only the first call installs.
pub fn init(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level.to_string()));
    INIT.call_once(|| {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("info");
        init("debug");
    }
}
