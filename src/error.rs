//! Error types for the forwarder.
//!
//! [`ForwarderError`] covers startup and CLI failures, [`ValidationError`]
//! describes a single bad config field, [`RelayError`] is the outcome of a
//! failed outbound call, and [`ProxyError`] is the per-request failure that
//! becomes the status code seen by the caller.

use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub route: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  route {}: {}: {}", self.route, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String only fails on OOM
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ForwarderError {
    #[error("No config source found.\n\n  {hint}")]
    NoConfigSource { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log file template '{template}': {reason}")]
    LogTemplate { template: String, reason: String },

    #[error("Failed to serialize log record: {0}")]
    LogSerialize(#[from] serde_json::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),

    #[error("Health check returned unexpected body: {0:?}")]
    HealthCheckBody(String),
}

/// Failure of a single outbound call. Non-2xx statuses are not failures.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("body read error: {0}")]
    BodyRead(String),

    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),
}

/// Per-request outcomes surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no route matches {path}")]
    RouteNotFound { path: String },

    #[error("missing or invalid authentication token (x-api-key)")]
    Unauthorized,

    #[error("primary target {target} unavailable: {source}")]
    UpstreamUnavailable {
        target: String,
        #[source]
        source: RelayError,
    },
}

impl ProxyError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                self.status(),
                axum::Json(serde_json::json!({ "detail": self.to_string() })),
            )
                .into_response(),
            other => other.status().into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_failure_has_empty_body_and_502() {
        let err = ProxyError::UpstreamUnavailable {
            target: "http://a".into(),
            source: RelayError::Timeout(Duration::from_millis(250)),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("250ms"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn route_not_found_maps_to_404() {
        let err = ProxyError::RouteNotFound { path: "/x".into() };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_error_display_includes_suggestion() {
        let err = ValidationError {
            route: "/a".into(),
            field: "prefix".into(),
            message: "bad".into(),
            suggestion: Some("fix it".into()),
        };
        assert_eq!(err.to_string(), "  route /a: prefix: bad (fix it)");
    }
}
