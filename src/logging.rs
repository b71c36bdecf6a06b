use std::sync::OnceLock;
use tracing::warn;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the global tracing subscriber, logging to stderr.
///
/// `RUST_LOG` wins over `default_level`. Later calls are no-ops; use
/// [`set_level`] to change the level of the installed subscriber.
pub fn init(default_level: &str) {
    let (filter, handle) = reload::Layer::new(level_filter(default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact();

    // Already set in tests or by an earlier call
    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
    {
        let _ = FILTER.set(handle);
    }
}

/// Swap the level of the subscriber installed by [`init`]
pub fn set_level(level: &str) {
    let Some(handle) = FILTER.get() else {
        return;
    };
    if let Err(e) = handle.reload(level_filter(level)) {
        warn!("Could not change the log level to {}: {}", level, e);
    }
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
