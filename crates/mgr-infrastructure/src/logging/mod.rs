//! Logging: tracing-subscriber initialization plus the bridge that plugs
//! tracing into the domain log facade.

use mgr_domain::ports::LogLevel;
use tracing_subscriber::EnvFilter;

/// Initialize tracing and register the domain log bridge. Call once at
/// startup.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // A second init (tests) is fine; the first subscriber wins.
    drop(result);

    mgr_domain::infra::logging::set_log_fn(forward_to_tracing);
}

fn forward_to_tracing(
    level: LogLevel,
    context: &str,
    message: &str,
    detail: Option<&dyn std::fmt::Display>,
) {
    let detail = detail.map(ToString::to_string);
    let detail = detail.as_deref().unwrap_or("");
    match level {
        LogLevel::Trace => tracing::trace!(target: "mgr", context, detail, "{message}"),
        LogLevel::Debug => tracing::debug!(target: "mgr", context, detail, "{message}"),
        LogLevel::Info => tracing::info!(target: "mgr", context, detail, "{message}"),
        LogLevel::Warn => tracing::warn!(target: "mgr", context, detail, "{message}"),
        LogLevel::Error => tracing::error!(target: "mgr", context, detail, "{message}"),
    }
}
