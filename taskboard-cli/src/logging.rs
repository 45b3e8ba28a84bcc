use taskboard_config::LoggingSettings;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Filter directive for the given flags; without a flag the configured level wins
pub fn filter_directive(verbose: bool, debug: bool, quiet: bool, settings: &LoggingSettings) -> String {
    let level = if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else if verbose {
        Level::TRACE
    } else {
        return settings.level.clone();
    };
    level.to_string().to_lowercase()
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
pub fn configure_logging(verbose: bool, debug: bool, quiet: bool, settings: &LoggingSettings) {
    let directive = filter_directive(verbose, debug, quiet, settings);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!(
            "Warning: invalid log level '{}': {}. Falling back to info.",
            directive, e
        );
        EnvFilter::new("info")
    });

    registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(settings.ansi),
        )
        .init();
}
