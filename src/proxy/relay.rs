//! Outbound calls to a single target.
//!
//! [`send`] performs one request against a [`ForwardTarget`] with the
//! inbound method, headers and body, bounded by the configured timeout.
//! A non-2xx status is a normal response; only transport failures and
//! timeouts are errors. [`relay_primary`] wraps it for the primary
//! target: it records the response and maps failures to a gateway error.

use std::time::{Duration, Instant};

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use url::Url;

use super::headers::{build_forwarded_headers, build_target_url};
use super::InboundRequest;
use crate::config::model::ForwardTarget;
use crate::error::{ProxyError, RelayError};
use crate::server::{AppState, HttpClient};
use crate::sink::{body_text, header_map, FailureEvent, LogEvent, ResponseEvent, TargetRole};

#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Where an outbound call went and how long it took.
#[derive(Debug)]
pub struct Exchange {
    pub url: Url,
    pub elapsed: Duration,
}

impl Exchange {
    #[must_use]
    pub fn latency_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

pub async fn send(
    client: &HttpClient,
    target: &ForwardTarget,
    request: &InboundRequest,
    timeout: Duration,
) -> (Exchange, Result<UpstreamResponse, RelayError>) {
    let url = build_target_url(&target.url, &request.query, &target.extra_params);
    let start = Instant::now();
    let result = call(client, &url, target, request, timeout).await;
    let exchange = Exchange {
        url,
        elapsed: start.elapsed(),
    };
    (exchange, result)
}

async fn call(
    client: &HttpClient,
    url: &Url,
    target: &ForwardTarget,
    request: &InboundRequest,
    timeout: Duration,
) -> Result<UpstreamResponse, RelayError> {
    let mut builder = hyper::Request::builder()
        .method(request.method.clone())
        .uri(url.as_str());
    if let Some(headers) = builder.headers_mut() {
        *headers = build_forwarded_headers(&request.headers, url, &target.extra_headers);
    }
    let outbound = builder
        .body(Full::new(request.body.clone()))
        .map_err(|e| RelayError::InvalidRequest(e.to_string()))?;

    let exchange = async {
        let response = client
            .request(outbound)
            .await
            .map_err(|e| RelayError::Connect(error_chain(&e)))?;
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| RelayError::BodyRead(error_chain(&e)))?
            .to_bytes();
        Ok::<_, RelayError>(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| RelayError::Timeout(timeout))?
}

/// Render an error with its source chain, `outer: inner: root`.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[must_use]
pub fn response_event(
    request_id: &str,
    role: TargetRole,
    exchange: &Exchange,
    response: &UpstreamResponse,
) -> LogEvent {
    LogEvent::Response(ResponseEvent {
        timestamp: Utc::now(),
        request_id: request_id.to_string(),
        role,
        target_url: exchange.url.to_string(),
        status_code: response.status.as_u16(),
        headers: header_map(&response.headers),
        body: body_text(&response.body),
        execution_time_seconds: exchange.elapsed.as_secs_f64(),
    })
}

#[must_use]
pub fn failure_event(
    request_id: &str,
    role: TargetRole,
    exchange: &Exchange,
    error: &RelayError,
) -> LogEvent {
    LogEvent::ForwardFailed(FailureEvent {
        timestamp: Utc::now(),
        request_id: request_id.to_string(),
        role,
        target_url: exchange.url.to_string(),
        error: error.to_string(),
        execution_time_seconds: exchange.elapsed.as_secs_f64(),
    })
}

/// Relay to the primary target and record its response.
///
/// Failures are not retried and are not written to the request log.
pub async fn relay_primary(
    state: &AppState,
    target: &ForwardTarget,
    request: &InboundRequest,
) -> Result<UpstreamResponse, ProxyError> {
    let (exchange, result) =
        send(&state.http_client, target, request, state.config.timeout()).await;
    let latency_ms = exchange.latency_ms();

    match result {
        Ok(response) => {
            tracing::info!(
                request_id = %request.id,
                target = %exchange.url,
                status = response.status.as_u16(),
                latency_ms,
                "primary target responded"
            );
            let event = response_event(&request.id, TargetRole::Primary, &exchange, &response);
            if let Err(e) = state.sink.append(&event).await {
                tracing::error!(request_id = %request.id, error = %e, "failed to write primary response record");
            }
            Ok(response)
        }
        Err(source) => {
            tracing::warn!(
                request_id = %request.id,
                target = %exchange.url,
                error = %source,
                latency_ms,
                "primary target failed"
            );
            Err(ProxyError::UpstreamUnavailable {
                target: exchange.url.to_string(),
                source,
            })
        }
    }
}
