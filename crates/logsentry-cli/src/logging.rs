// Tracing setup for the logsentry binary

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Events go to stderr so they never mix with
/// the console sink's report on stdout.
///
/// Filter precedence: `--verbose`, then `RUST_LOG`, then the configured level.
pub fn init(configured_level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured_level))
    };

    // a second init (tests, embedding) is not an error worth failing on
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
