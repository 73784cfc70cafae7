//! Tracing subscriber bootstrap for binaries.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber from `RUST_LOG`, defaulting to
/// `info`. Safe to call once per process; later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init(); // must not panic on double initialization
    }
}
