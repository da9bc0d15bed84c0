//! Optional API-key check.
//!
//! When `api_key` is configured, callers must send it as the `x-api-key`
//! query parameter or header. The key is removed before the request is
//! logged or forwarded.

use axum::http::HeaderMap;

use crate::error::ProxyError;

pub const API_KEY: &str = "x-api-key";

pub fn check_api_key(
    expected: &str,
    headers: &HeaderMap,
    query: &[(String, String)],
) -> Result<(), ProxyError> {
    let supplied = query
        .iter()
        .find(|(key, _)| key == API_KEY)
        .map(|(_, value)| value.as_str())
        .or_else(|| headers.get(API_KEY).and_then(|v| v.to_str().ok()));

    if supplied == Some(expected) {
        Ok(())
    } else {
        tracing::warn!(
            present = supplied.is_some(),
            "missing or invalid authentication token (x-api-key)"
        );
        Err(ProxyError::Unauthorized)
    }
}

pub fn strip_api_key(headers: &mut HeaderMap, query: &mut Vec<(String, String)>) {
    headers.remove(API_KEY);
    query.retain(|(key, _)| key != API_KEY);
}
