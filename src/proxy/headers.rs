//! Header and query construction for outbound calls.
//!
//! [`build_forwarded_headers`] clones the inbound headers, strips
//! hop-by-hop headers, rewrites `Host` for the target, and applies the
//! target's `extra_headers`, which win over inbound values.
//! [`build_target_url`] merges the inbound query with the target's
//! `extra_params` the same way.

use std::collections::HashMap;
use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Strip hop-by-hop headers and `content-length` from an upstream response.
///
/// The body has already been fully collected, so the origin's framing
/// headers no longer apply. Axum sets `content-length` from the bytes.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(hyper::header::CONTENT_LENGTH);
}

pub fn build_forwarded_headers(
    original: &HeaderMap,
    target_url: &Url,
    extra_headers: &HashMap<String, String>,
) -> HeaderMap {
    let mut headers = original.clone();

    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }

    headers.remove(hyper::header::HOST);
    if let Some(host) = target_url.host_str() {
        let host_value = target_url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        if let Ok(val) = HeaderValue::from_str(&host_value) {
            headers.insert(hyper::header::HOST, val);
        }
    }

    for (key, value) in extra_headers {
        match (key.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            (Ok(name), Ok(val)) => {
                headers.insert(name, val);
            }
            _ => {
                tracing::warn!(header = %key, "invalid extra header name or value, skipping");
            }
        }
    }

    headers
}

/// Target URL with the inbound query merged in.
///
/// Keeps the target's own query pairs, then appends inbound pairs whose
/// keys are not overridden by `extra_params`, then `extra_params`.
#[must_use]
pub fn build_target_url(
    target: &Url,
    inbound_query: &[(String, String)],
    extra_params: &HashMap<String, String>,
) -> Url {
    let mut url = target.clone();
    if inbound_query.is_empty() && extra_params.is_empty() {
        return url;
    }

    let mut extras: Vec<(&String, &String)> = extra_params.iter().collect();
    extras.sort();

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in inbound_query {
            if !extra_params.contains_key(key) {
                pairs.append_pair(key, value);
            }
        }
        for (key, value) in extras {
            pairs.append_pair(key, value);
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extras(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn strips_hop_by_hop() {
        let mut original = HeaderMap::new();
        original.insert("connection", "keep-alive".parse().unwrap());
        original.insert("content-type", "application/json".parse().unwrap());

        let target = Url::parse("http://target:8080").unwrap();
        let result = build_forwarded_headers(&original, &target, &HashMap::new());

        assert!(result.get("connection").is_none());
        assert_eq!(result.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn rewrites_host() {
        let mut original = HeaderMap::new();
        original.insert("host", "proxy.local".parse().unwrap());
        let target = Url::parse("http://backend:9090/path").unwrap();
        let result = build_forwarded_headers(&original, &target, &HashMap::new());

        assert_eq!(result.get("host").unwrap(), "backend:9090");
        assert_eq!(result.get_all("host").iter().count(), 1);
    }

    #[test]
    fn extra_headers_override_inbound() {
        let mut original = HeaderMap::new();
        original.insert("x-tenant", "client".parse().unwrap());
        original.insert("x-keep", "yes".parse().unwrap());
        let target = Url::parse("http://target:8080").unwrap();
        let result = build_forwarded_headers(
            &original,
            &target,
            &extras(&[("x-tenant", "mirror"), ("authorization", "Bearer t")]),
        );

        assert_eq!(result.get("x-tenant").unwrap(), "mirror");
        assert_eq!(result.get("x-keep").unwrap(), "yes");
        assert_eq!(result.get("authorization").unwrap(), "Bearer t");
    }

    #[test]
    fn response_strip_removes_content_length() {
        let mut headers = HeaderMap::new();
        headers.insert("content-length", "10".parse().unwrap());
        headers.insert("transfer-encoding", "chunked".parse().unwrap());
        headers.insert("x-upstream", "a".parse().unwrap());
        strip_response_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn query_is_merged_with_extras_taking_precedence() {
        let target = Url::parse("http://target/hook?fixed=1").unwrap();
        let inbound = vec![
            ("user".to_string(), "42".to_string()),
            ("source".to_string(), "client".to_string()),
        ];
        let url = build_target_url(&target, &inbound, &extras(&[("source", "mirror")]));
        assert_eq!(url.as_str(), "http://target/hook?fixed=1&user=42&source=mirror");
    }

    #[test]
    fn url_without_query_is_unchanged() {
        let target = Url::parse("http://target/hook").unwrap();
        let url = build_target_url(&target, &[], &HashMap::new());
        assert_eq!(url.as_str(), "http://target/hook");
    }
}
