//! Configuration validation with detailed error reporting.
//!
//! [`validate`] checks a parsed [`Config`] for empty or malformed
//! prefixes, duplicates, routes made unreachable by an earlier prefix,
//! bad target URLs and extra headers, a zero timeout, and an unusable
//! log file template.

use axum::http::{HeaderName, HeaderValue};

use super::model::{Config, ForwardTarget};
use crate::error::ValidationError;
use crate::sink;

/// Validate a single route prefix. Returns `Ok(())` or a human-readable error.
pub fn validate_prefix(prefix: &str) -> Result<(), String> {
    if prefix.is_empty() {
        return Err("prefix cannot be empty".into());
    }
    if !prefix.starts_with('/') {
        return Err("prefix must start with '/'".into());
    }
    Ok(())
}

/// Validate a target URL scheme. Returns `Ok(())` or a human-readable error.
pub fn validate_target_url(url: &url::Url) -> Result<(), String> {
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(format!(
                "unsupported scheme '{other}' (expected http or https)"
            ))
        }
    }
    if url.host_str().is_none() {
        return Err(format!("'{url}' has no host"));
    }
    Ok(())
}

fn validate_target(route_id: &str, role: &str, target: &ForwardTarget) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Err(msg) = validate_target_url(&target.url) {
        errors.push(ValidationError {
            route: route_id.to_string(),
            field: format!("{role}.url"),
            message: msg,
            suggestion: None,
        });
    }

    for (name, value) in &target.extra_headers {
        if name.parse::<HeaderName>().is_err() {
            errors.push(ValidationError {
                route: route_id.to_string(),
                field: format!("{role}.extra_headers"),
                message: format!("'{name}' is not a valid header name"),
                suggestion: None,
            });
        } else if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError {
                route: route_id.to_string(),
                field: format!("{role}.extra_headers"),
                message: format!("value of '{name}' is not a valid header value"),
                suggestion: None,
            });
        }
    }

    errors
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeout == 0 {
        errors.push(ValidationError {
            route: "(root)".into(),
            field: "timeout".into(),
            message: "timeout must be greater than 0".into(),
            suggestion: Some("the default is 5000".into()),
        });
    }

    if let Err(reason) = sink::check_template(&config.log_file) {
        errors.push(ValidationError {
            route: "(root)".into(),
            field: "log_file".into(),
            message: reason,
            suggestion: Some("e.g. 'logs/forward_%Y%m%d.jsonl'".into()),
        });
    }

    if matches!(config.api_key.as_deref(), Some("")) {
        errors.push(ValidationError {
            route: "(root)".into(),
            field: "api_key".into(),
            message: "api_key cannot be empty when set".into(),
            suggestion: None,
        });
    }

    if config.routes.is_empty() {
        errors.push(ValidationError {
            route: "(root)".into(),
            field: "routes".into(),
            message: "at least one route must be defined".into(),
            suggestion: None,
        });
        return Err(errors);
    }

    for (i, route) in config.routes.iter().enumerate() {
        let route_id = if route.prefix.is_empty() {
            format!("routes[{i}]")
        } else {
            route.prefix.clone()
        };

        if let Err(msg) = validate_prefix(&route.prefix) {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "prefix".into(),
                message: msg,
                suggestion: if route.prefix.is_empty() {
                    None
                } else {
                    Some(format!("did you mean '/{}'?", route.prefix))
                },
            });
        }

        // First match wins, so an earlier prefix that is a prefix of this
        // one makes this route unreachable.
        if let Some(earlier) = config.routes[..i]
            .iter()
            .find(|r| !r.prefix.is_empty() && route.prefix.starts_with(&r.prefix))
        {
            let message = if earlier.prefix == route.prefix {
                "duplicate route prefix".to_string()
            } else {
                format!("unreachable: every path is already matched by '{}'", earlier.prefix)
            };
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "prefix".into(),
                message,
                suggestion: (earlier.prefix != route.prefix).then(|| {
                    format!(
                        "declare '{}' before '{}'",
                        route.prefix, earlier.prefix
                    )
                }),
            });
        }

        errors.extend(validate_target(&route_id, "primary", &route.primary));
        for (j, secondary) in route.secondaries.iter().enumerate() {
            errors.extend(validate_target(
                &route_id,
                &format!("secondaries[{j}]"),
                secondary,
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  {} routes, {} targets, timeout {}ms, log file {}\n",
        config.routes.len(),
        config.total_targets(),
        config.timeout,
        config.log_file,
    )];

    for route in &config.routes {
        lines.push(format!(
            "  {}  -> {} (+{} secondaries)",
            route.prefix,
            route.primary.url,
            route.secondaries.len(),
        ));
        for secondary in &route.secondaries {
            lines.push(format!("    mirror: {}", secondary.url));
        }
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
