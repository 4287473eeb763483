//! Structured logging setup.
//!
//! A single `init()` that wires `tracing-subscriber`'s `EnvFilter` from
//! `RUST_LOG`, falling back to `info`. No OpenTelemetry or Prometheus
//! exporters: ward has no metrics surface to feed them.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber. Call once, at process start.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}
