//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,pdfbuild=info,pdfbuild_builder=info,pdfbuild_jobs=info";
const DEBUG_FILTER: &str = "info,pdfbuild=debug,pdfbuild_builder=debug,pdfbuild_jobs=debug";

/// Install the global subscriber. `RUST_LOG` takes precedence over both
/// built-in filters.
pub fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let fallback = if debug_enabled {
        DEBUG_FILTER
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}
