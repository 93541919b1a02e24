//! Fetch strategy pipeline
//!
//! Three strategies talk to the upstream, one per attempt:
//!
//! | Attempt | Strategy | Requests | Timeout |
//! |---------|----------|----------|---------|
//! | 0 | Form submission | GET form (token optional), POST form | 15s |
//! | 1 | Alternate endpoint | POST to secondary path, JSON or HTML | 20s |
//! | 2+ | Token scrape | GET form for fresh token, POST with referer | 10s / 25s |
//!
//! A failing strategy never falls through to another one within the same
//! attempt; the orchestrator moves on by starting the next attempt.

use crate::config::FetcherConfig;
use crate::fetcher::client::{check_status, network_error, read_document, read_text, RawDocument};
use crate::query::ResultQuery;
use crate::RelayError;
use reqwest::header::REFERER;
use reqwest::Client;
use scraper::{Html, Selector};
use std::fmt;
use std::time::Duration;

/// Hidden inputs and meta tags that may carry an anti-forgery token
const TOKEN_SELECTORS: &[(&str, &str)] = &[
    ("input[name=\"_token\"]", "value"),
    ("input[name=\"__RequestVerificationToken\"]", "value"),
    ("input[name=\"csrf_token\"]", "value"),
    ("meta[name=\"csrf-token\"]", "content"),
];

/// One way of retrieving a raw result document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    FormSubmission,
    AlternateEndpoint,
    TokenScrape,
}

impl FetchStrategy {
    /// Strategy used for a given zero-based attempt
    pub fn for_attempt(attempt: usize) -> Self {
        match attempt {
            0 => Self::FormSubmission,
            1 => Self::AlternateEndpoint,
            _ => Self::TokenScrape,
        }
    }

    /// Performs one upstream round trip
    ///
    /// # Returns
    ///
    /// * `Ok(RawDocument)` - The document to hand to the normalizer
    /// * `Err(RelayError::Network)` - Timeout, refused connection, DNS failure
    /// * `Err(RelayError::Upstream)` - The upstream answered with an error status
    pub async fn fetch(
        &self,
        client: &Client,
        config: &FetcherConfig,
        query: &ResultQuery,
    ) -> Result<RawDocument, RelayError> {
        match self {
            Self::FormSubmission => form_submission(client, config, query).await,
            Self::AlternateEndpoint => alternate_endpoint(client, config, query).await,
            Self::TokenScrape => token_scrape(client, config, query).await,
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FormSubmission => "form submission",
            Self::AlternateEndpoint => "alternate endpoint",
            Self::TokenScrape => "token scrape",
        };
        f.write_str(name)
    }
}

async fn form_submission(
    client: &Client,
    config: &FetcherConfig,
    query: &ResultQuery,
) -> Result<RawDocument, RelayError> {
    let url = config.form_url();
    let timeout = Duration::from_millis(config.form_timeout_ms);

    // The token is a bonus here; submit without one if the form page fails
    let token = match fetch_form_token(client, &url, timeout).await {
        Ok(token) => token,
        Err(e) => {
            tracing::debug!("Form page unavailable, submitting without token: {}", e);
            None
        }
    };

    let html = submit_form(client, &url, query, token, timeout).await?;
    Ok(RawDocument::Html(html))
}

async fn alternate_endpoint(
    client: &Client,
    config: &FetcherConfig,
    query: &ResultQuery,
) -> Result<RawDocument, RelayError> {
    let url = config.alternate_url();
    let response = client
        .post(&url)
        .form(&query.form_fields())
        .timeout(Duration::from_millis(config.alternate_timeout_ms))
        .send()
        .await
        .map_err(|e| network_error(&url, &e))?;

    let response = check_status(&url, response)?;
    read_document(&url, response).await
}

async fn token_scrape(
    client: &Client,
    config: &FetcherConfig,
    query: &ResultQuery,
) -> Result<RawDocument, RelayError> {
    let url = config.form_url();
    let token = fetch_form_token(
        client,
        &url,
        Duration::from_millis(config.token_page_timeout_ms),
    )
    .await?;

    if token.is_none() {
        tracing::debug!("No anti-forgery token on {}", url);
    }

    let html = submit_form(
        client,
        &url,
        query,
        Some(token.unwrap_or_default()),
        Duration::from_millis(config.token_submit_timeout_ms),
    )
    .await?;
    Ok(RawDocument::Html(html))
}

/// GETs the form page and harvests its anti-forgery token, if any
async fn fetch_form_token(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<Option<String>, RelayError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| network_error(url, &e))?;

    let response = check_status(url, response)?;
    let html = read_text(url, response).await?;
    Ok(extract_token(&html))
}

/// POSTs the query as a form, with `_token` when one is given
async fn submit_form(
    client: &Client,
    url: &str,
    query: &ResultQuery,
    token: Option<String>,
    timeout: Duration,
) -> Result<String, RelayError> {
    let mut fields = Vec::with_capacity(6);
    if let Some(token) = token {
        fields.push(("_token", token));
    }
    fields.extend(query.form_fields());

    let response = client
        .post(url)
        .header(REFERER, url)
        .form(&fields)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| network_error(url, &e))?;

    let response = check_status(url, response)?;
    read_text(url, response).await
}

/// Finds an anti-forgery token in a form page
pub(crate) fn extract_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    TOKEN_SELECTORS.iter().find_map(|(css, attr)| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .filter_map(|element| element.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
    })
}
