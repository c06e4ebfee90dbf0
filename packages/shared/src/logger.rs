//! Tracing subscriber setup for the Noteboard binaries.

use tracing_subscriber::{EnvFilter, fmt};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence. Without it, the binary and the Noteboard
/// library crates log at `default_level` and `tower_http` at `info`.
///
/// Calling this more than once is harmless: later calls are ignored.
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(bin_name, default_level)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .with_target(true)
        .try_init();
}

fn default_directives(bin_name: &str, default_level: &str) -> String {
    // Cargo bin names may contain '-', tracing targets use the crate path.
    let bin_target = bin_name.replace('-', "_");
    format!(
        "{bin_target}={default_level},noteboard_server={default_level},noteboard_client={default_level},tower_http=info"
    )
}
