//! Log record shapes written by the [`LogSink`](super::LogSink).
//!
//! Every record is one JSON object tagged by `event`. Bodies are stored
//! as text; a body that is not valid UTF-8 is replaced with
//! [`BODY_PLACEHOLDER`] so the record stays well-formed.

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BODY_PLACEHOLDER: &str = "[Body is not valid UTF-8]";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    Request(RequestEvent),
    Response(ResponseEvent),
    ForwardFailed(FailureEvent),
}

impl LogEvent {
    #[must_use]
    pub fn request_id(&self) -> &str {
        match self {
            Self::Request(e) => &e.request_id,
            Self::Response(e) => &e.request_id,
            Self::ForwardFailed(e) => &e.request_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    Primary,
    Secondary,
}

impl std::fmt::Display for TargetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestEvent {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEvent {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub role: TargetRole,
    pub target_url: String,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub execution_time_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureEvent {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub role: TargetRole,
    pub target_url: String,
    pub error: String,
    pub execution_time_seconds: f64,
}

/// Decode a body for logging, substituting the placeholder on invalid UTF-8.
#[must_use]
pub fn body_text(body: &[u8]) -> String {
    std::str::from_utf8(body).map_or_else(|_| BODY_PLACEHOLDER.to_string(), str::to_string)
}

/// Keep at most `limit` bytes, cut back to the last complete UTF-8 character.
#[must_use]
pub fn truncated_text(body: &[u8], limit: usize) -> String {
    let head = &body[..body.len().min(limit)];
    match std::str::from_utf8(head) {
        Ok(s) => s.to_string(),
        Err(e) => String::from_utf8_lossy(&head[..e.valid_up_to()]).into_owned(),
    }
}

/// Flatten headers for logging. Repeated headers are joined with `", "`.
#[must_use]
pub fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    out
}
