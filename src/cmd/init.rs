//! `forwarder init`: generate a starter configuration file.
//!
//! Writes a YAML, JSON, or TOML config with either a minimal or a fully
//! documented template.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::ForwarderError;

pub fn execute(args: &InitArgs) -> Result<(), ForwarderError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("forwarder.{}", args.format.extension())));

    if output.exists() {
        return Err(ForwarderError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

#[must_use]
pub const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# forwarder config

routes:
  - prefix: "/forward"
    primary:
      url: "http://localhost:8080/forward"
    secondaries:
      - url: "http://localhost:8081/mirror"
"#;

const YAML_FULL: &str = r#"# forwarder config
#
# Values shown for timeout and log_file are the defaults.

# Timeout in milliseconds for every outbound call (primary and secondaries)
timeout: 5000

# Request log, one JSON object per line, one file per UTC day.
# strftime template; it must contain a day placeholder.
log_file: "forward_%Y%m%d.jsonl"

# Require callers to send this key as ?x-api-key= or an x-api-key header.
# The key is removed before logging and forwarding.
# api_key: "changeme"

# Routes are matched in the order listed: the first prefix that starts
# the request path wins. List the most specific prefixes first.
routes:
  - prefix: "/forward/orders"
    # The primary's response is returned to the caller
    primary:
      url: "http://orders:8080/ingest"
      extra_headers:
        X-Source: "forwarder"
      extra_params:
        channel: "proxy"
    # Secondaries receive a copy only after the primary succeeds
    secondaries:
      - url: "http://audit:9090/orders"
      - url: "http://analytics:9091/events"
        extra_headers:
          Authorization: "Bearer analytics-token"

  - prefix: "/forward"
    primary:
      url: "http://localhost:8080/forward"
"#;

const JSON_MINIMAL: &str = r#"{
  "routes": [
    {
      "prefix": "/forward",
      "primary": { "url": "http://localhost:8080/forward" },
      "secondaries": [
        { "url": "http://localhost:8081/mirror" }
      ]
    }
  ]
}
"#;

const JSON_FULL: &str = r#"{
  "timeout": 5000,
  "log_file": "forward_%Y%m%d.jsonl",
  "routes": [
    {
      "prefix": "/forward/orders",
      "primary": {
        "url": "http://orders:8080/ingest",
        "extra_headers": { "X-Source": "forwarder" },
        "extra_params": { "channel": "proxy" }
      },
      "secondaries": [
        { "url": "http://audit:9090/orders" },
        {
          "url": "http://analytics:9091/events",
          "extra_headers": { "Authorization": "Bearer analytics-token" }
        }
      ]
    },
    {
      "prefix": "/forward",
      "primary": { "url": "http://localhost:8080/forward" }
    }
  ]
}
"#;

const TOML_MINIMAL: &str = r#"# forwarder config

[[routes]]
prefix = "/forward"

[routes.primary]
url = "http://localhost:8080/forward"

[[routes.secondaries]]
url = "http://localhost:8081/mirror"
"#;

const TOML_FULL: &str = r#"# forwarder config
#
# Values shown for timeout and log_file are the defaults.

# Timeout in milliseconds for every outbound call
timeout = 5000

# strftime template for the daily request log
log_file = "forward_%Y%m%d.jsonl"

# api_key = "changeme"

# Routes match in the order listed; most specific prefix first.
[[routes]]
prefix = "/forward/orders"

[routes.primary]
url = "http://orders:8080/ingest"

[routes.primary.extra_headers]
X-Source = "forwarder"

[routes.primary.extra_params]
channel = "proxy"

[[routes.secondaries]]
url = "http://audit:9090/orders"

[[routes.secondaries]]
url = "http://analytics:9091/events"

[routes.secondaries.extra_headers]
Authorization = "Bearer analytics-token"

[[routes]]
prefix = "/forward"

[routes.primary]
url = "http://localhost:8080/forward"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sources::parse_config_str;
    use crate::config::validation::validate;

    fn check(format: ConfigFormat) {
        for full in [false, true] {
            let content = template(&format, full);
            let config = parse_config_str(format.extension(), content, "template").unwrap();
            validate(&config).unwrap();
        }
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yaml_templates_are_valid() {
        check(ConfigFormat::Yaml);
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_templates_are_valid() {
        check(ConfigFormat::Json);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_templates_are_valid() {
        check(ConfigFormat::Toml);
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("forwarder.yaml");
        std::fs::write(&output, "existing").unwrap();

        let args = InitArgs {
            format: ConfigFormat::Yaml,
            output: Some(output.clone()),
            full: false,
        };
        assert!(matches!(
            execute(&args),
            Err(ForwarderError::FileExists { .. })
        ));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "existing");
    }
}
