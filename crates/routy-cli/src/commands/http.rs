//! HTTP helpers for daemon communication

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Daemon address used when `ROUTY_DAEMON_URL` is unset
pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:8000";

/// Get the daemon URL from environment or use default
pub fn daemon_url() -> String {
    std::env::var("ROUTY_DAEMON_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| DEFAULT_DAEMON_URL.to_string())
}

/// Full URL for an API path such as `/api/v1/stats`
pub fn endpoint(path: &str) -> String {
    format!("{}{}", daemon_url(), path)
}

/// Execute GET request
pub async fn get(url: &str) -> Result<Response, reqwest::Error> {
    debug!("GET {}", url);
    Client::new().get(url).send().await
}

/// Execute GET request with query parameters
pub async fn get_query<Q: Serialize + ?Sized>(
    url: &str,
    query: &Q,
) -> Result<Response, reqwest::Error> {
    debug!("GET {}", url);
    Client::new().get(url).query(query).send().await
}

/// Execute POST request with JSON body
pub async fn post_json<T: Serialize + ?Sized>(
    url: &str,
    body: &T,
) -> Result<Response, reqwest::Error> {
    debug!("POST {}", url);
    Client::new().post(url).json(body).send().await
}

/// Decode a JSON response, turning daemon error bodies into errors
pub async fn json_or_error(resp: Response) -> Result<Value> {
    let status = resp.status();
    let body: Value = resp
        .json()
        .await
        .with_context(|| format!("Daemon returned a non-JSON response ({status})"))?;

    if status.is_success() {
        return Ok(body);
    }

    let message = body["error"].as_str().unwrap_or("unknown error");
    match body["error_type"].as_str() {
        Some(kind) => anyhow::bail!("{message} [{kind}, HTTP {status}]"),
        None => anyhow::bail!("{message} [HTTP {status}]"),
    }
}

/// Fail early with a readable message when the daemon is down
pub async fn check_daemon() -> Result<()> {
    let resp = get(&endpoint("/health"))
        .await
        .context("Could not connect to Routy daemon. Is it running?")?;

    if !resp.status().is_success() {
        anyhow::bail!("Routy daemon is not healthy. Status: {}", resp.status());
    }
    Ok(())
}
