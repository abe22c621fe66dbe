//! `tracing-subscriber` bootstrap shared by every binary in the workspace.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber filtered by `log_filter` (an
/// `EnvFilter` directive string, e.g. `"warn,relayer=debug"`), writing
/// human-readable output to stderr. Falls back to `log_stderr_threshold`
/// alone if `log_filter` fails to parse, so a bad configuration value never
/// leaves the process silently unobserved.
///
/// Safe to call at most once per process; subsequent calls are a no-op.
pub fn initialize(log_filter: &str, log_stderr_threshold: tracing::level_filters::LevelFilter) {
    let env_filter = EnvFilter::try_new(log_filter)
        .unwrap_or_else(|_| EnvFilter::new(log_stderr_threshold.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_does_not_panic_on_bad_filter() {
        initialize("not a valid filter (((", tracing::level_filters::LevelFilter::ERROR);
    }
}
