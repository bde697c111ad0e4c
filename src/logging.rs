//! Tracing subscriber setup for the `intake` binary.
//!
//! Logs go to stderr so stdout stays machine-readable. The filter comes
//! from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "doc_intake=info,doc_intake_core=info";

/// Install the global subscriber. `json` switches to JSON lines.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
}
