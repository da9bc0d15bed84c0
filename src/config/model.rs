//! Serde data structures for the forwarder configuration file.
//!
//! [`Config`] is the root. Routes are an ordered list: the first route
//! whose `prefix` starts the request path wins, so declaration order is
//! part of the configuration's meaning. All types use
//! `deny_unknown_fields` for strict parsing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_LOG_FILE: &str = "forward_%Y%m%d.jsonl";

const fn default_timeout() -> u64 {
    5000
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

fn is_default_timeout(v: &u64) -> bool {
    *v == default_timeout()
}

fn is_default_log_file(v: &str) -> bool {
    v == DEFAULT_LOG_FILE
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Timeout in milliseconds applied to every outbound call.
    #[serde(
        default = "default_timeout",
        skip_serializing_if = "is_default_timeout"
    )]
    pub timeout: u64,

    /// strftime template for the day-partitioned request log.
    #[serde(
        default = "default_log_file",
        skip_serializing_if = "is_default_log_file"
    )]
    pub log_file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub routes: Vec<RouteConfig>,
}

impl Config {
    #[must_use]
    pub fn total_targets(&self) -> usize {
        self.routes.iter().map(|r| 1 + r.secondaries.len()).sum()
    }

    #[must_use]
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub prefix: String,

    pub primary: ForwardTarget,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondaries: Vec<ForwardTarget>,
}

/// An upstream destination, used as a primary or a secondary.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardTarget {
    pub url: Url,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_headers: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_params: HashMap<String, String>,
}

impl ForwardTarget {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            extra_headers: HashMap::new(),
            extra_params: HashMap::new(),
        }
    }
}
