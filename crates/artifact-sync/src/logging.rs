//! Tracing subscriber setup for applications embedding the orchestrator

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{Error, Result};

/// Filter used when `RUST_LOG` is unset: session progress from the
/// artifact crates, warnings from everything else.
pub const DEFAULT_FILTER: &str = "warn,artifact_sync=info,artifact_remote=info,artifact_fs=info";

/// Install a compact stdout subscriber filtered by `RUST_LOG`, falling back
/// to [`DEFAULT_FILTER`].
pub fn init() -> Result<()> {
    init_with(DEFAULT_FILTER)
}

/// Like [`init`] with a caller-chosen fallback filter.
///
/// Fails if the fallback directive is invalid or a global subscriber is
/// already installed.
pub fn init_with(fallback: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(fallback)
            .map_err(|e| Error::config(format!("invalid log filter {fallback:?}: {e}")))?,
    };

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::config(format!("logging already initialized: {e}")))
}
