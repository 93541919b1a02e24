//! HTTP client construction and transport helpers
//!
//! The upstream may treat non-browser clients differently, so every request
//! carries a browser-like identity. Redirects are followed and cookies kept,
//! because form pages tie their anti-forgery token to a session cookie.

use crate::config::FetcherConfig;
use crate::RelayError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client, Response};
use std::time::Duration;

const ACCEPT_VALUE: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7";

/// A raw upstream document awaiting normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawDocument {
    Html(String),
    Json(serde_json::Value),
}

/// Builds the HTTP client shared by every strategy
///
/// # Example
///
/// ```no_run
/// use result_relay::config::FetcherConfig;
/// use result_relay::fetcher::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a transport error onto a [`RelayError::Network`]
pub(crate) fn network_error(url: &str, error: &reqwest::Error) -> RelayError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else {
        error.to_string()
    };

    RelayError::Network {
        url: url.to_string(),
        message,
    }
}

/// Rejects non-success statuses as upstream failures
pub(crate) fn check_status(url: &str, response: Response) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    tracing::debug!("{} answered HTTP {}", url, status.as_u16());
    Err(RelayError::Upstream(format!(
        "The result server responded with HTTP {}",
        status.as_u16()
    )))
}

/// Reads a response body as text
pub(crate) async fn read_text(url: &str, response: Response) -> Result<String, RelayError> {
    response.text().await.map_err(|e| network_error(url, &e))
}

/// Reads a response body, choosing JSON or HTML by its declared content type
pub(crate) async fn read_document(url: &str, response: Response) -> Result<RawDocument, RelayError> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    let body = read_text(url, response).await?;
    if is_json {
        parse_json(&body).map(RawDocument::Json)
    } else {
        Ok(RawDocument::Html(body))
    }
}

pub(crate) fn parse_json(body: &str) -> Result<serde_json::Value, RelayError> {
    serde_json::from_str(body)
        .map_err(|_| RelayError::Parse("The result server sent an unreadable response".to_string()))
}
