//! Process diagnostics through `tracing`.
//!
//! These are operator-facing logs (startup, relay outcomes, fan-out
//! failures), separate from the request record log in [`crate::sink`].
//! Output is JSON unless stdout is a terminal or `--pretty` is given.

use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Filter for `level`. The outbound client's own connection chatter is
/// capped at `warn` so `debug` stays readable.
#[must_use]
pub fn filter(level: &LogLevel) -> Targets {
    Targets::new()
        .with_default(level.to_tracing_level())
        .with_target("hyper_util", tracing::Level::WARN)
        .with_target("rustls", tracing::Level::WARN)
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(level: &LogLevel, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter(level));
    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(false))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_json_wins() {
        assert_eq!(resolve_format(true, true), LogFormat::Json);
        assert_eq!(resolve_format(false, true), LogFormat::Json);
        assert_eq!(resolve_format(true, false), LogFormat::Pretty);
    }

    #[test]
    fn filter_caps_client_noise() {
        let targets = filter(&LogLevel::Trace);
        assert!(targets.would_enable("forwarder::proxy", &tracing::Level::TRACE));
        assert!(!targets.would_enable("hyper_util::client", &tracing::Level::DEBUG));
    }
}
