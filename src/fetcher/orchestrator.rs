//! Retrieval orchestrator
//!
//! [`ResultFetcher::fetch_result`] is the single entry point for callers. It
//! tries, in order:
//!
//! 1. The result cache
//! 2. The demo identity
//! 3. Three attempts through the strategy pipeline, with backoff between them
//! 4. Each configured fallback source, once
//!
//! Retrievals that reach step 3 are reported to the [`Monitor`].

use crate::cache::{CacheStats, ResultCache};
use crate::config::Config;
use crate::fetcher::client::{build_http_client, check_status, network_error, parse_json, read_text};
use crate::fetcher::strategy::FetchStrategy;
use crate::fetcher::{parse_document, RawDocument};
use crate::monitor::{HealthReport, Monitor};
use crate::query::ResultQuery;
use crate::record::{demo_record, is_demo_identity, ResultRecord};
use crate::{FailureKind, RelayError};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One attempt per strategy
pub const MAX_ATTEMPTS: usize = 3;

/// Retrieves results, sharing its cache and monitor across clones
#[derive(Debug, Clone)]
pub struct ResultFetcher {
    config: Arc<Config>,
    client: Client,
    cache: Arc<ResultCache>,
    monitor: Arc<Monitor>,
}

impl ResultFetcher {
    /// Creates a fetcher with its own cache and monitor
    pub fn new(config: Config) -> Result<Self, RelayError> {
        let cache = Arc::new(ResultCache::from_config(&config.cache));
        let monitor = Arc::new(Monitor::from_config(&config.monitor));
        Self::with_parts(config, cache, monitor)
    }

    /// Creates a fetcher around an existing cache and monitor
    pub fn with_parts(
        config: Config,
        cache: Arc<ResultCache>,
        monitor: Arc<Monitor>,
    ) -> Result<Self, RelayError> {
        let client = build_http_client(&config.fetcher)?;
        Ok(Self {
            config: Arc::new(config),
            client,
            cache,
            monitor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("Result cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn health_report(&self) -> HealthReport {
        self.monitor.report(self.cache.stats())
    }

    /// Retrieves the result for `query`
    ///
    /// # Returns
    ///
    /// * `Ok(ResultRecord)` - From the cache, the demo identity, a strategy,
    ///   or a fallback source
    /// * `Err(RelayError::Retrieval)` - Every avenue failed; the message is the
    ///   most meaningful failure seen
    pub async fn fetch_result(&self, query: &ResultQuery) -> Result<ResultRecord, RelayError> {
        let key = query.cache_key();
        let started = Instant::now();

        if let Some(record) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {}", key);
            if self.config.monitor.record_cache_hits {
                self.monitor.record_request(true, elapsed_ms(started), None);
            }
            return Ok(record);
        }

        if self.config.demo.enabled && is_demo_identity(query.roll(), query.registration()) {
            tracing::info!("Serving demo record for {}", key);
            let record = demo_record(query.roll(), query.registration());
            self.cache.put(&key, record.clone());
            return Ok(record);
        }

        tracing::info!("Fetching result for {}", key);
        let mut failures = Vec::new();

        for attempt in 0..MAX_ATTEMPTS {
            match self.attempt(query, attempt).await {
                Ok(record) => return Ok(self.succeed(&key, record, started)),
                Err(e) => {
                    tracing::warn!("Attempt {} for {} failed: {}", attempt + 1, key, e);
                    failures.push(e);
                }
            }

            if attempt + 1 < MAX_ATTEMPTS {
                let delay = self.config.retry.delay_after(attempt);
                if !delay.is_zero() {
                    tracing::debug!("Backing off {}ms before next attempt", delay.as_millis());
                }
                tokio::time::sleep(delay).await;
            }
        }

        for url in &self.config.fetcher.fallback_urls {
            match self.fetch_fallback(url, query).await {
                Ok(record) => {
                    tracing::info!("Fallback source {} answered for {}", url, key);
                    return Ok(self.succeed(&key, record, started));
                }
                Err(e) => {
                    tracing::warn!("Fallback source {} failed: {}", url, e);
                    failures.push(e);
                }
            }
        }

        Err(self.fail(&key, failures, started))
    }

    async fn attempt(
        &self,
        query: &ResultQuery,
        attempt: usize,
    ) -> Result<ResultRecord, RelayError> {
        let strategy = FetchStrategy::for_attempt(attempt);
        tracing::debug!("Attempt {} using {}", attempt + 1, strategy);

        let document = strategy
            .fetch(&self.client, &self.config.fetcher, query)
            .await?;
        parse_document(&document, query)
    }

    /// Single GET against a fallback source, parsed as JSON
    async fn fetch_fallback(
        &self,
        url: &str,
        query: &ResultQuery,
    ) -> Result<ResultRecord, RelayError> {
        let params = [
            ("board", query.board().as_str()),
            ("exam", query.exam().as_str()),
            ("roll", query.roll()),
            ("reg", query.registration()),
            ("eiin", query.eiin().unwrap_or("")),
        ];

        let response = self
            .client
            .get(url)
            .query(&params)
            .timeout(Duration::from_millis(self.config.fetcher.fallback_timeout_ms))
            .send()
            .await
            .map_err(|e| network_error(url, &e))?;

        let response = check_status(url, response)?;
        let body = read_text(url, response).await?;
        let payload = parse_json(&body)?;
        parse_document(&RawDocument::Json(payload), query)
    }

    fn succeed(&self, key: &str, record: ResultRecord, started: Instant) -> ResultRecord {
        let elapsed = elapsed_ms(started);
        self.cache.put(key, record.clone());
        self.monitor.record_request(true, elapsed, None);
        tracing::info!("Result for {} retrieved in {}ms", key, elapsed);
        record
    }

    fn fail(&self, key: &str, failures: Vec<RelayError>, started: Instant) -> RelayError {
        // Every message is scanned, so a captcha seen on any attempt counts
        let combined = failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        self.monitor
            .record_request(false, elapsed_ms(started), Some(&combined));

        let last = most_meaningful(failures);
        let message = last
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "Failed to fetch result after all retry attempts".to_string());

        tracing::error!("Retrieval for {} failed: {}", key, message);
        RelayError::Retrieval {
            message,
            last: last.map(Box::new),
        }
    }
}

/// Picks the failure to show the caller
///
/// What the upstream said (an explicit error, or "no result") is preferred
/// over transport noise; within a class the latest failure wins.
fn most_meaningful(failures: Vec<RelayError>) -> Option<RelayError> {
    let position = failures
        .iter()
        .rposition(|e| matches!(e.kind(), Some(FailureKind::Upstream | FailureKind::Parse)));

    match position {
        Some(i) => failures.into_iter().nth(i),
        None => failures.into_iter().last(),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
