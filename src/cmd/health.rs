//! `forwarder health`: check that a running instance is alive.
//!
//! Sends `GET /?test=1` to the given URL. The proxy answers that request
//! itself with `200 Test OK`, without routing, logging or forwarding.

use http_body_util::BodyExt;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::cli::HealthArgs;
use crate::error::ForwarderError;
use crate::proxy::HEALTH_CHECK_BODY;

#[must_use]
pub fn check_url(base: &str) -> String {
    format!("{}/?test=1", base.trim_end_matches('/'))
}

pub async fn execute(args: HealthArgs) -> Result<(), ForwarderError> {
    let uri: hyper::Uri = check_url(&args.url).parse().map_err(
        |e: hyper::http::uri::InvalidUri| ForwarderError::UriParse {
            source: Box::new(e),
        },
    )?;

    let connector = hyper_util::client::legacy::connect::HttpConnector::new();
    let client = Client::builder(TokioExecutor::new()).build(connector);

    let req = hyper::Request::builder()
        .uri(uri)
        .body(http_body_util::Full::new(bytes::Bytes::new()))
        .map_err(|e| ForwarderError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(std::time::Duration::from_secs(10), client.request(req))
        .await
        .map_err(|_| ForwarderError::HttpRequest {
            source: "health check timed out after 10s".into(),
        })?
        .map_err(|e| ForwarderError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| ForwarderError::HttpRequest {
            source: Box::new(e),
        })?
        .to_bytes();

    if !status.is_success() {
        return Err(ForwarderError::HealthCheckFailed(status));
    }

    let body = String::from_utf8_lossy(&body);
    if body != HEALTH_CHECK_BODY {
        return Err(ForwarderError::HealthCheckBody(body.into_owned()));
    }

    println!("\u{2713} forwarder is healthy ({})", args.url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_url_appends_marker() {
        assert_eq!(check_url("http://localhost:8000"), "http://localhost:8000/?test=1");
        assert_eq!(check_url("http://localhost:8000/"), "http://localhost:8000/?test=1");
    }
}
