//! Axum server setup, shared application context, and graceful shutdown.
//!
//! [`AppState`] is the immutable context built once at startup: the
//! validated config (route table and timeout), the connection-pooled
//! outbound client, the request log and a few counters. It is shared as
//! an `Arc` by the request path and every fan-out task.
//! [`build_router`] mounts the catch-all proxy handler with middleware
//! layers, and [`shutdown_signal`] handles SIGTERM / Ctrl+C.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::model::Config;
use crate::error::ForwarderError;
use crate::proxy;
use crate::sink::LogSink;

#[derive(Debug)]
pub struct Stats {
    /// Primary relays that returned a response to the caller.
    pub forwarded: AtomicU64,
    /// Primary relays that ended in a 502.
    pub failed: AtomicU64,
    pub mirrored: AtomicU64,
    pub mirror_failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            mirrored: AtomicU64::new(0),
            mirror_failed: AtomicU64::new(0),
        }
    }

    pub fn log_summary(&self, uptime: Duration) {
        tracing::info!(
            uptime_secs = uptime.as_secs(),
            forwarded = self.forwarded.load(Ordering::Relaxed),
            failed = self.failed.load(Ordering::Relaxed),
            mirrored = self.mirrored.load(Ordering::Relaxed),
            mirror_failed = self.mirror_failed.load(Ordering::Relaxed),
            "request totals"
        );
    }
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, http_body_util::Full<bytes::Bytes>>;

pub struct AppState {
    pub config: Config,
    pub http_client: HttpClient,
    pub sink: LogSink,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    /// Build the context from a validated config.
    pub fn new(config: Config) -> Result<Self, ForwarderError> {
        let sink = LogSink::new(config.log_file.clone())?;
        Ok(Self {
            config,
            http_client: build_http_client(),
            sink,
            start_time: Instant::now(),
            stats: Stats::new(),
        })
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // rustls cannot pick a provider on its own when more than one is
    // compiled in; `ring` is the one this crate enables.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    Router::new()
        .fallback(proxy::forward_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // The `Bytes` extractor has its own 2 MiB default.
                .layer(DefaultBodyLimit::max(max_body))
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
