use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogFormat;

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` (default `info`).
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
        EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Install the global subscriber. Safe to call twice; the second call is a no-op.
pub fn init_tracing(format: LogFormat) {
    let builder = fmt().with_env_filter(env_filter()).with_target(true);
    let res = match format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
