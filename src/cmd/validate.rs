//! `forwarder validate`: check a configuration file for errors.
//!
//! Exits non-zero when the file cannot be parsed or fails validation.
//! The JSON output lists routes in match order so tooling can confirm
//! which prefix a path will hit.

use serde_json::{json, Value};

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::model::{Config, ForwardTarget};
use crate::config::sources::parse_config_str;
use crate::config::validation;
use crate::error::{ForwarderError, ValidationError};

pub fn execute(args: &ValidateArgs) -> Result<(), ForwarderError> {
    let path = &args.config;
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ForwarderError::ConfigFileNotFound { path: path.clone() },
        _ => ForwarderError::Io(e),
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let display = path.display().to_string();
    let config = parse_config_str(ext, &content, &display)?;

    match (validation::validate(&config), &args.format) {
        (Ok(()), ValidateFormat::Text) => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&display, &config)
            );
            Ok(())
        }
        (Ok(()), ValidateFormat::Json) => {
            println!("{}", valid_report(&config));
            Ok(())
        }
        (Err(errors), ValidateFormat::Text) => {
            eprintln!("\u{2717} {display} has {} errors\n", errors.len());
            for error in &errors {
                eprintln!("{error}");
            }
            Err(ForwarderError::ConfigValidation { errors })
        }
        (Err(errors), ValidateFormat::Json) => {
            println!("{}", invalid_report(&errors));
            Err(ForwarderError::ConfigValidation { errors })
        }
    }
}

fn target_json(target: &ForwardTarget) -> Value {
    json!({
        "url": target.url.as_str(),
        "extra_headers": target.extra_headers.len(),
        "extra_params": target.extra_params.len(),
    })
}

fn valid_report(config: &Config) -> Value {
    let routes: Vec<Value> = config
        .routes
        .iter()
        .enumerate()
        .map(|(order, route)| {
            json!({
                "order": order,
                "prefix": route.prefix,
                "primary": target_json(&route.primary),
                "secondaries": route.secondaries.iter().map(target_json).collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "valid": true,
        "timeout_ms": config.timeout,
        "log_file": config.log_file,
        "auth": config.api_key.is_some(),
        "targets": config.total_targets(),
        "routes": routes,
    })
}

fn invalid_report(errors: &[ValidationError]) -> Value {
    json!({
        "valid": false,
        "errors": errors
            .iter()
            .map(|e| json!({
                "route": e.route,
                "field": e.field,
                "message": e.message,
                "suggestion": e.suggestion,
            }))
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RouteConfig;

    fn config() -> Config {
        let target = |u: &str| ForwardTarget::new(url::Url::parse(u).unwrap());
        Config {
            timeout: 1500,
            log_file: "forward_%Y%m%d.jsonl".into(),
            api_key: Some("k".into()),
            routes: vec![
                RouteConfig {
                    prefix: "/a/b".into(),
                    primary: target("http://a:80/"),
                    secondaries: vec![target("http://m1:80/"), target("http://m2:80/")],
                },
                RouteConfig {
                    prefix: "/a".into(),
                    primary: target("http://a:80/"),
                    secondaries: vec![],
                },
            ],
        }
    }

    #[test]
    fn json_report_keeps_match_order() {
        let report = valid_report(&config());
        assert_eq!(report["valid"], true);
        assert_eq!(report["auth"], true);
        assert_eq!(report["targets"], 4);
        assert_eq!(report["routes"][0]["prefix"], "/a/b");
        assert_eq!(report["routes"][1]["order"], 1);
        assert_eq!(report["routes"][0]["secondaries"][1]["url"], "http://m2:80/");
    }

    #[test]
    fn api_key_value_is_not_reported() {
        let report = valid_report(&config()).to_string();
        assert!(!report.contains("\"k\""));
    }

    #[test]
    fn missing_file_is_reported() {
        let args = ValidateArgs {
            config: "/nonexistent/forwarder.yaml".into(),
            format: ValidateFormat::Text,
        };
        assert!(matches!(
            execute(&args),
            Err(ForwarderError::ConfigFileNotFound { .. })
        ));
    }
}
