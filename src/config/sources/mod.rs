//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! File-based sources (YAML, JSON, TOML) gated by feature flags, plus
//! the [`parse_config_str`] helper used by `forwarder validate`.

pub mod file_source;

pub use file_source::FileSource;

use crate::config::model::Config;
use crate::error::ForwarderError;

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, ForwarderError> {
    #[allow(unused_variables)]
    let parse_error = |e: Box<dyn std::error::Error + Send + Sync>| ForwarderError::ConfigParse {
        path: path_display.to_string(),
        source: e,
    };

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        other => Err(ForwarderError::UnsupportedFormat(other.to_string())),
    }
}
