// ABOUTME: Shared logging setup for keyaudit binaries
// ABOUTME: init_with_level() logs to stderr so stdout stays free for reports

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging to stderr with an explicit default level, RUST_LOG override.
/// Used by the CLI to map `-v`/`-q` onto a level.
///
/// Always writes to stderr; stdout is reserved for the audit report.
pub fn init_with_level(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .try_init();
}

/// Map the CLI's verbosity counters onto a default level.
///
/// `quiet` wins over `verbose`; each `-v` steps INFO → DEBUG → TRACE.
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_init_with_level() {
        let _ = super::init_with_level as fn(Level);
    }

    #[test]
    fn test_level_for_defaults_to_info() {
        assert_eq!(level_for(0, false), Level::INFO);
    }

    #[test]
    fn test_level_for_verbose_steps() {
        assert_eq!(level_for(1, false), Level::DEBUG);
        assert_eq!(level_for(2, false), Level::TRACE);
        assert_eq!(level_for(7, false), Level::TRACE);
    }

    #[test]
    fn test_level_for_quiet_wins() {
        assert_eq!(level_for(3, true), Level::ERROR);
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_with_level(Level::WARN);
        init_with_level(Level::WARN);
    }
}
