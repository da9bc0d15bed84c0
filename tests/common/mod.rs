//! Shared harness: in-process upstreams and a proxy bound to an
//! ephemeral port, with its request log in a temporary directory.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use forwarder::config::model::{Config, ForwardTarget, RouteConfig, DEFAULT_LOG_FILE};
use forwarder::server::{self, AppState};
use forwarder::sink::{read_segment, LogEvent};
use tempfile::TempDir;
use url::Url;

/// One request as received by a test upstream.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

struct Behavior {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    hits: AtomicUsize,
    seen: Mutex<Vec<Seen>>,
}

pub struct Upstream {
    pub addr: SocketAddr,
    behavior: Arc<Behavior>,
}

impl Upstream {
    pub fn url(&self, path: &str) -> Url {
        format!("http://{}{path}", self.addr).parse().unwrap()
    }

    pub fn hits(&self) -> usize {
        self.behavior.hits.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.behavior.seen.lock().unwrap().clone()
    }
}

pub async fn upstream(status: u16, body: &'static str) -> Upstream {
    slow_upstream(status, body, Duration::ZERO).await
}

pub async fn slow_upstream(status: u16, body: &'static str, delay: Duration) -> Upstream {
    let behavior = Arc::new(Behavior {
        status: StatusCode::from_u16(status).unwrap(),
        body,
        delay,
        hits: AtomicUsize::new(0),
        seen: Mutex::new(Vec::new()),
    });

    let router = Router::new()
        .fallback(answer)
        .with_state(Arc::clone(&behavior));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Upstream { addr, behavior }
}

async fn answer(State(behavior): State<Arc<Behavior>>, request: Request) -> Response {
    behavior.hits.fetch_add(1, Ordering::SeqCst);
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    behavior.seen.lock().unwrap().push(Seen {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers: parts.headers,
        body,
    });

    if !behavior.delay.is_zero() {
        tokio::time::sleep(behavior.delay).await;
    }

    (
        behavior.status,
        [("x-upstream", "test"), ("content-type", "text/plain")],
        behavior.body,
    )
        .into_response()
}

/// A URL nothing listens on.
pub async fn dead_url(path: &str) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{path}").parse().unwrap()
}

pub fn route(prefix: &str, primary: Url, secondaries: Vec<Url>) -> RouteConfig {
    RouteConfig {
        prefix: prefix.into(),
        primary: ForwardTarget::new(primary),
        secondaries: secondaries.into_iter().map(ForwardTarget::new).collect(),
    }
}

pub fn config(routes: Vec<RouteConfig>) -> Config {
    Config {
        timeout: 2000,
        log_file: DEFAULT_LOG_FILE.into(),
        api_key: None,
        routes,
    }
}

pub struct Proxy {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    _dir: TempDir,
}

impl Proxy {
    pub async fn start(config: Config) -> Self {
        Self::start_with_body_limit(config, 1_048_576).await
    }

    pub async fn start_with_body_limit(mut config: Config, max_body: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        config.log_file = dir
            .path()
            .join("forward_%Y%m%d.jsonl")
            .to_string_lossy()
            .into_owned();
        let state = Arc::new(AppState::new(config).unwrap());
        let router = server::build_router(Arc::clone(&state), max_body);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
        });

        Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            _dir: dir,
        }
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{path_and_query}", self.addr)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Every record in today's segment; empty if nothing was written.
    pub async fn records(&self) -> Vec<LogEvent> {
        let path = self.state.sink.current_path().unwrap();
        if !path.exists() {
            return Vec::new();
        }
        read_segment(&path).await.unwrap_or_default()
    }

    /// Poll until at least `count` records exist, or give up after 5s.
    pub async fn wait_for_records(&self, count: usize) -> Vec<LogEvent> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let records = self.records().await;
            if records.len() >= count || tokio::time::Instant::now() >= deadline {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.stop();
    }
}
