//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Honors `RUST_LOG`; safe to call more than once (later calls are ignored),
/// which keeps test binaries that share a process from panicking.
pub fn init() {
    let _ = env_logger::builder().try_init();
}

/// Initialize logging with a fallback level when `RUST_LOG` is unset
pub fn init_with_level(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_with_level("debug");
        init();
        info!("logging initialized twice without panicking");
    }
}
