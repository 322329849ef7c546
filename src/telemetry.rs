//! Tracing setup for the binary.
//!
//! Diagnostics go to stderr so the rendered tables own stdout. Workers run
//! on named threads, so thread names are worth printing.

use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an env-filter directive; overrides `-v`.
pub const LOG_ENV_VAR: &str = "MODPIPE_LOG";

/// Install the global subscriber. Safe to call more than once; later calls
/// lose and keep the first subscriber, which is what tests want.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .try_init();
}

fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_from_verbosity(0), LevelFilter::ERROR);
        assert_eq!(level_from_verbosity(1), LevelFilter::INFO);
        assert_eq!(level_from_verbosity(2), LevelFilter::DEBUG);
        assert_eq!(level_from_verbosity(9), LevelFilter::DEBUG);
    }
}
