//! `tracing` setup and the per-request span.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Installs the global subscriber, filtered by `settings.log_level`.
///
/// With `settings.debug` set, output is pretty and multi-line with source
/// locations; otherwise events are written as JSON lines. An unparsable
/// filter falls back to `info`. A second call is a no-op.
pub fn setup_logging(settings: &Settings) {
    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::Subscriber::builder().with_env_filter(filter).with_target(true);
    let installed = if settings.debug {
        builder.with_file(true).with_line_number(true).pretty().try_init()
    } else {
        builder.json().try_init()
    };
    if installed.is_err() {
        tracing::trace!("subscriber already installed");
    }
}

/// The span every viewset dispatch runs in.
///
/// ```
/// use rest_extras_core::logging::request_span;
///
/// let span = request_span("TestsVanillaViewSet", "GET", "/tests-vanilla/");
/// let _guard = span.enter();
/// tracing::info!("listing");
/// ```
pub fn request_span(viewset: &str, method: &str, path: &str) -> tracing::Span {
    tracing::info_span!("api_request", %viewset, %method, %path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_filter_and_second_install_are_harmless() {
        let settings = Settings {
            log_level: "not a [valid filter".to_string(),
            ..Settings::default()
        };
        setup_logging(&settings);
        setup_logging(&Settings {
            debug: true,
            ..Settings::default()
        });
    }

    #[test]
    fn test_span_metadata() {
        let span = request_span("UsersViewSet", "PATCH", "/auth-user/1/");
        let _guard = span.enter();
        tracing::debug!("inside span");
    }
}
