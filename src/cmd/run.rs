//! `forwarder run`: start the proxy server.
//!
//! Loads and validates the configuration, applies CLI and environment
//! overrides, builds the shared [`AppState`] and serves until SIGTERM or
//! Ctrl+C. The outbound client and the request log live exactly as long
//! as this function.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::model::Config;
use crate::config::sources::FileSource;
use crate::config::validation::validate;
use crate::config::ConfigSource;
use crate::error::ForwarderError;
use crate::logging;
use crate::server::{self, AppState};

const CANDIDATES: [&str; 4] = [
    "forwarder.yaml",
    "forwarder.yml",
    "forwarder.json",
    "forwarder.toml",
];

pub async fn execute(args: RunArgs) -> Result<(), ForwarderError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let source = resolve_file_source(args.config.as_deref()).await?;
    let mut config = source.load().await?;
    apply_overrides(&mut config, &args, std::env::var("FORWARDER_API_KEY").ok())?;

    let route_count = config.routes.len();
    let target_count = config.total_targets();
    let state = Arc::new(AppState::new(config)?);

    let router = server::build_router(Arc::clone(&state), args.max_body);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        config = %source.path().display(),
        format = source.name(),
        routes = route_count,
        targets = target_count,
        timeout_ms = state.config.timeout,
        log_file = %state.sink.template(),
        auth = state.config.api_key.is_some(),
        "forwarder started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    if let Err(e) = state.sink.flush().await {
        tracing::error!(error = %e, "failed to flush request log");
    }
    state.stats.log_summary(state.start_time.elapsed());
    tracing::info!("forwarder stopped");
    Ok(())
}

/// Apply CLI and environment overrides, then re-validate.
fn apply_overrides(
    config: &mut Config,
    args: &RunArgs,
    api_key: Option<String>,
) -> Result<(), ForwarderError> {
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    if let Some(ref template) = args.log_file {
        config.log_file.clone_from(template);
    }
    if let Some(key) = api_key {
        config.api_key = Some(key);
    }
    validate(config).map_err(|errors| ForwarderError::ConfigValidation { errors })
}

async fn resolve_file_source(explicit: Option<&Path>) -> Result<FileSource, ForwarderError> {
    if let Some(path) = explicit {
        return FileSource::for_path(path);
    }

    for name in &CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return FileSource::for_path(&path);
        }
    }

    Err(ForwarderError::NoConfigSource {
        hint: "Provide --config <file> or set CONFIG_FILE.\n  \
               Run 'forwarder init' to create a config file."
            .into(),
    })
}
