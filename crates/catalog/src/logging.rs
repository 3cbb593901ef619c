//! Log output for the binary.
//!
//! The library only emits `tracing` events; this module decides where they
//! go. Logs are written to stderr so stdout stays free for commands such as
//! `catalog config`.

use anyhow::Context;
use std::io;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Build the filter from a directive such as `info` or `catalogapp=debug,info`.
pub fn env_filter(directive: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(directive).with_context(|| format!("invalid log filter '{}'", directive))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(directive: &str, json: bool) -> anyhow::Result<()> {
    let filter = env_filter(directive)?;
    let registry = tracing_subscriber::registry();

    if json {
        let layer = fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_filter(filter);
        registry
            .with(layer)
            .try_init()
            .context("failed to install log subscriber")?;
    } else {
        let layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(filter);
        registry
            .with(layer)
            .try_init()
            .context("failed to install log subscriber")?;
    }
    Ok(())
}
