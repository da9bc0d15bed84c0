//! `forwarder echo`: a catch-all debug upstream.
//!
//! Answers every request with a small JSON greeting and records what it
//! received as a request record, through the same [`LogSink`] the proxy
//! uses. Useful as a primary or secondary target when trying out a
//! routing config. Optional artificial latency makes it easy to exercise
//! the proxy's timeout handling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::Utc;
use rand::Rng;
use tower_http::trace::TraceLayer;

use crate::cli::EchoArgs;
use crate::error::ForwarderError;
use crate::logging;
use crate::proxy::parse_query;
use crate::server;
use crate::sink::event::truncated_text;
use crate::sink::{body_text, header_map, LogEvent, LogSink, RequestEvent};

pub const BODY_NOT_KEPT: &str = "[Body logging not enabled]";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delay {
    None,
    Fixed(Duration),
    Between(f64, f64),
}

impl Delay {
    #[must_use]
    pub fn from_secs(values: &[f64]) -> Self {
        match *values {
            [secs] => Duration::try_from_secs_f64(secs).map_or(Self::None, Self::Fixed),
            [a, b] if a.is_finite() && b.is_finite() => {
                Self::Between(a.min(b).max(0.0), a.max(b).max(0.0))
            }
            _ => Self::None,
        }
    }

    fn sample(self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed(d) => Some(d),
            Self::Between(lo, hi) => {
                Duration::try_from_secs_f64(rand::thread_rng().gen_range(lo..=hi)).ok()
            }
        }
    }
}

/// How much of each request body the echo server records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLogging {
    Off,
    Whole,
    Prefix(usize),
}

impl BodyLogging {
    /// `--keep-body` absent, bare, or with a byte count. A count of 0 keeps nothing.
    #[must_use]
    pub const fn from_flag(flag: Option<Option<usize>>) -> Self {
        match flag {
            None | Some(Some(0)) => Self::Off,
            Some(None) => Self::Whole,
            Some(Some(limit)) => Self::Prefix(limit),
        }
    }

    #[must_use]
    pub fn render(self, body: &[u8]) -> String {
        match self {
            Self::Off => BODY_NOT_KEPT.to_string(),
            Self::Whole => body_text(body),
            Self::Prefix(limit) => truncated_text(body, limit),
        }
    }
}

#[derive(Debug)]
pub struct EchoState {
    pub sink: Option<LogSink>,
    pub print: bool,
    pub delay: Delay,
    pub keep_body: BodyLogging,
}

pub async fn execute(args: EchoArgs) -> Result<(), ForwarderError> {
    logging::init(&args.log_level, logging::resolve_format(false, false));

    let sink = args.log_file.clone().map(LogSink::new).transpose()?;
    let state = Arc::new(EchoState {
        sink,
        print: args.print,
        delay: Delay::from_secs(&args.delay),
        keep_body: BodyLogging::from_flag(args.keep_body),
    });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, delay = ?state.delay, "echo server started");

    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("echo server stopped");
    Ok(())
}

pub fn build_router(state: Arc<EchoState>) -> Router {
    Router::new()
        .fallback(echo_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn echo_handler(State(state): State<Arc<EchoState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body: Bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    let event = RequestEvent {
        timestamp: Utc::now(),
        request_id: uuid::Uuid::new_v4().to_string(),
        method: parts.method.to_string(),
        url: parts.uri.to_string(),
        path: parts.uri.path().to_string(),
        headers: header_map(&parts.headers),
        query_params: parse_query(parts.uri.query()).into_iter().collect(),
        remote_addr,
        body: state.keep_body.render(&body),
    };

    if state.print {
        print_event(&event);
    }
    if let Some(ref sink) = state.sink {
        if let Err(e) = sink.append(&LogEvent::Request(event)).await {
            tracing::error!(error = %e, "failed to write echo record");
        }
    }

    if let Some(delay) = state.delay.sample() {
        tokio::time::sleep(delay).await;
    }

    Json(serde_json::json!({
        "message": "Hello World",
        "path": parts.uri.path(),
        "timestamp": Utc::now(),
    }))
    .into_response()
}

fn print_event(event: &RequestEvent) {
    let pretty = |map: &std::collections::BTreeMap<String, String>| {
        serde_json::to_string_pretty(map).unwrap_or_default()
    };
    println!("Timestamp: {}", event.timestamp.to_rfc3339());
    println!("Method: {}", event.method);
    println!("URL: {}", event.url);
    println!("Path: {}", event.path);
    println!("Headers: {}", pretty(&event.headers));
    println!("Query Params: {}", pretty(&event.query_params));
    println!("Body: {}", event.body);
    println!("------");
}
