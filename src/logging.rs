//! Logging setup with tracing.

use tracing_subscriber::EnvFilter;

/// Level used when HOSTSYNC_LOG is unset: warn, then info, then debug per `-v`.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install a stderr subscriber. HOSTSYNC_LOG, when set, overrides the verbosity.
/// Calling it twice is harmless.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env("HOSTSYNC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
