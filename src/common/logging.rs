//! Logging and tracing configuration
//!
//! All log output goes to stderr so it never mixes with command output that
//! scripts capture from stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "conjur=warn,warn";

/// Filter used for `--debug`
const DEBUG_FILTER: &str = "conjur=debug,info";

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable. `--debug`
/// takes precedence over it.
pub fn init_cli(debug: bool) {
    let filter = if debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(debug)
                .with_line_number(debug)
                .compact(),
        )
        .init();
}
