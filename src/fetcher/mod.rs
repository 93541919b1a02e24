//! Fetcher module for upstream result retrieval
//!
//! This module contains the retrieval logic, including:
//! - HTTP client construction and transport error mapping
//! - The three-strategy fetch pipeline
//! - HTML and JSON normalization into a [`ResultRecord`]
//! - Orchestration across cache, retries and fallback sources

mod client;
mod json;
mod orchestrator;
mod parser;
mod strategy;

pub use client::{build_http_client, RawDocument};
pub use json::parse_result_json;
pub use orchestrator::{ResultFetcher, MAX_ATTEMPTS};
pub use parser::parse_result_html;
pub use strategy::FetchStrategy;

use crate::query::ResultQuery;
use crate::record::ResultRecord;
use crate::RelayError;

/// Normalizes a raw document of either kind
pub fn parse_document(
    document: &RawDocument,
    query: &ResultQuery,
) -> Result<ResultRecord, RelayError> {
    match document {
        RawDocument::Html(html) => parse_result_html(html, query),
        RawDocument::Json(payload) => parse_result_json(payload, query),
    }
}
