//! Diagnostics on stderr
//!
//! Reports go to stdout; everything logged through `tracing` goes to stderr so
//! `--json` and `--dependency-graph` output stays machine-readable.

use crate::core::error::{SelectError, SelectResult};
use std::io;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` with `verbose`.
pub fn init_logging(verbose: bool) -> SelectResult<()> {
  let level = if verbose { "debug" } else { "warn" };
  let env_filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(format!("selective_testing={level},warn")))
    .map_err(|e| SelectError::message(format!("Failed to create tracing filter: {e}")))?;

  let layer = tracing_subscriber::fmt::layer()
    .compact()
    .with_writer(io::stderr)
    .with_target(verbose)
    .without_time();

  tracing_subscriber::registry()
    .with(env_filter)
    .with(layer)
    .try_init()
    .map_err(|e| SelectError::message(format!("Failed to initialize logging: {e}")))?;

  tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Logging initialized");
  Ok(())
}
