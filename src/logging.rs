//! Logging setup for binaries.
//!
//! The library only emits `tracing` events; binaries call [`init_logging`]
//! once at startup to print them.

use std::env;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Our crate is debug, everything else is warn.
pub const DEFAULT_FILTER: &str = "warn,beauvoir=debug";

/// Install a compact stdout subscriber. `RUST_LOG` directives are appended
/// to [`DEFAULT_FILTER`], so they can both widen and narrow it.
pub fn init_logging() {
    let format = fmt::format().compact().with_line_number(true);
    let stdout_log = fmt::layer().event_format(format);

    let mut filter = DEFAULT_FILTER.to_owned();
    if let Ok(env_filter) = env::var(EnvFilter::DEFAULT_ENV) {
        filter.push(',');
        filter.push_str(&env_filter);
    }

    let subscriber = Registry::default()
        .with(EnvFilter::new(filter))
        .with(stdout_log);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("log subscriber already installed");
        return;
    }
    info!(version = crate::VERSION, "logging initialized");
}
