use crate::errors::{ObserveError, ObserveResult};
use crate::policy::current_policy;
use once_cell::sync::OnceCell;
use tracing::{span, Level, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

static INIT: OnceCell<bool> = OnceCell::new();

/// Installs the global subscriber once. `RUST_LOG` wins over
/// `default_filter`. Logs go to stderr so stdout stays free for renderers.
/// Returns whether this call installed it.
pub fn init_tracing(default_filter: &str) -> ObserveResult<bool> {
    let mut installed_now = false;
    let outcome = INIT.get_or_try_init(|| -> ObserveResult<bool> {
        let policy = current_policy();
        if !policy.enable_tracing {
            return Ok(false);
        }
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));
        let result = if policy.json_logs {
            let layer = fmt::layer().json().with_writer(std::io::stderr);
            tracing::subscriber::set_global_default(Registry::default().with(filter).with(layer))
        } else {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing::subscriber::set_global_default(Registry::default().with(filter).with(layer))
        };
        result.map_err(|_| ObserveError::SubscriberTaken)?;
        installed_now = true;
        Ok(true)
    });
    outcome.map(|_| installed_now)
}

/// Span wrapping one monitoring session.
pub fn session_span(title: &str, source: &str) -> Span {
    span!(Level::INFO, "trail_session", title = %title, source = %source)
}
