//! Inbound request handling.
//!
//! [`forward_handler`] is the Axum fallback that receives every request.
//! It answers the `?test=1` liveness check directly, checks the API key
//! when one is configured, resolves the route, logs the request, relays
//! it to the primary target and returns the primary's response. After a
//! successful relay it hands the request to the fan-out dispatcher,
//! which replicates it to the secondaries without delaying the response.
//! Submodules handle route matching ([`routing`]), header and query
//! construction ([`headers`]), single-target calls ([`relay`]),
//! secondary replication ([`fanout`]) and API keys ([`auth`]).

pub mod auth;
pub mod fanout;
pub mod headers;
pub mod relay;
pub mod routing;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::error::ProxyError;
use crate::server::AppState;
use crate::sink::{body_text, header_map, LogEvent, RequestEvent};

pub const HEALTH_CHECK_BODY: &str = "Test OK";

/// A buffered inbound request, shared by the primary relay and every
/// secondary.
#[derive(Debug)]
pub struct InboundRequest {
    pub id: String,
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Bytes,
    pub remote_addr: Option<SocketAddr>,
}

impl InboundRequest {
    /// The request as seen by the proxy, with the query re-encoded.
    #[must_use]
    pub fn url(&self) -> String {
        let mut url = self
            .headers
            .get(hyper::header::HOST)
            .and_then(|h| h.to_str().ok())
            .map_or_else(String::new, |host| format!("http://{host}"));
        url.push_str(&self.path);
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(
                &url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&self.query)
                    .finish(),
            );
        }
        url
    }

    #[must_use]
    pub fn log_event(&self) -> LogEvent {
        LogEvent::Request(RequestEvent {
            timestamp: Utc::now(),
            request_id: self.id.clone(),
            method: self.method.to_string(),
            url: self.url(),
            path: self.path.clone(),
            headers: header_map(&self.headers),
            query_params: self.query.iter().cloned().collect(),
            remote_addr: self.remote_addr.map(|a| a.to_string()),
            body: body_text(&self.body),
        })
    }
}

/// `true` when the query carries the literal `test=1` marker.
#[must_use]
pub fn is_health_check(query: Option<&str>) -> bool {
    query.is_some_and(|q| {
        url::form_urlencoded::parse(q.as_bytes()).any(|(key, value)| key == "test" && value == "1")
    })
}

#[must_use]
pub fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    query.map_or_else(Vec::new, |q| {
        url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect()
    })
}

pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    if is_health_check(uri.query()) {
        return (StatusCode::OK, HEALTH_CHECK_BODY).into_response();
    }

    match handle(state, addr, method, &uri, req_headers, body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn handle(
    state: Arc<AppState>,
    addr: SocketAddr,
    method: Method,
    uri: &Uri,
    mut req_headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let mut query = parse_query(uri.query());
    if let Some(expected) = state.config.api_key.as_deref() {
        auth::check_api_key(expected, &req_headers, &query)?;
        auth::strip_api_key(&mut req_headers, &mut query);
    }

    let path = uri.path();
    let Some(route_idx) = routing::match_route(&state.config.routes, path) else {
        tracing::warn!(method = %method, path = %path, "no route matched");
        return Err(ProxyError::RouteNotFound {
            path: path.to_string(),
        });
    };
    let route = &state.config.routes[route_idx];

    let id = req_headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    tracing::info!(
        request_id = %id,
        method = %method,
        path = %path,
        prefix = %route.prefix,
        secondaries = route.secondaries.len(),
        "request received"
    );

    let request = Arc::new(InboundRequest {
        id,
        method,
        path: path.to_string(),
        headers: req_headers,
        query,
        body,
        remote_addr: Some(addr),
    });

    // The request record must be on disk before any response record.
    if let Err(e) = state.sink.append(&request.log_event()).await {
        tracing::error!(request_id = %request.id, error = %e, "failed to write request record");
    }

    let upstream = match relay::relay_primary(&state, &route.primary, &request).await {
        Ok(upstream) => upstream,
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }
    };
    state.stats.forwarded.fetch_add(1, Ordering::Relaxed);

    let response = into_client_response(&request.method, upstream);

    if !route.secondaries.is_empty() {
        // Detached: the response above does not wait for replication.
        drop(fanout::dispatch(Arc::clone(&state), route_idx, request));
    }

    Ok(response)
}

fn into_client_response(method: &Method, upstream: relay::UpstreamResponse) -> Response {
    let relay::UpstreamResponse {
        status,
        headers: mut resp_headers,
        body,
    } = upstream;
    // No body came back for these, so the origin's length is the only true one.
    let declared_length = (*method == Method::HEAD || status == StatusCode::NOT_MODIFIED)
        .then(|| resp_headers.get(hyper::header::CONTENT_LENGTH).cloned())
        .flatten();
    headers::strip_response_hop_by_hop(&mut resp_headers);
    if let Some(length) = declared_length {
        resp_headers.insert(hyper::header::CONTENT_LENGTH, length);
    }

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = resp_headers;
    response
}
