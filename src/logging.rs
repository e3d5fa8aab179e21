//! Tracing subscriber setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the embedding application. `RUST_LOG` selects the filter and defaults
//! to `info`.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::{Result, SamplerError};

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Installs the global fmt subscriber, writing to stderr.
///
/// Fails if called more than once.
pub fn init_tracing() -> Result<()> {
    INITIALISED
        .set(())
        .map_err(|_| SamplerError::config_invalid("tracing has already been initialised"))?;

    let filter = default_filter();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| SamplerError::config_invalid(format!("cannot install subscriber: {}", e)))
}

/// Filter from `RUST_LOG`, or `info` when unset or unparsable.
fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
