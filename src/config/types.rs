use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Result-Relay
///
/// Every section is optional in the TOML file; missing sections fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub monitor: MonitorConfig,
    pub demo: DemoConfig,
}

/// Upstream endpoints, request identity, and per-strategy timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// Root URL of the education-board result site
    pub base_url: String,

    /// Path of the HTML result form, relative to `base_url`
    pub form_path: String,

    /// Path of the secondary result endpoint, relative to `base_url`
    pub alternate_path: String,

    /// Sources tried once each, in order, after every strategy failed
    pub fallback_urls: Vec<String>,

    /// Browser-like user agent sent with every request
    pub user_agent: String,

    pub form_timeout_ms: u64,
    pub alternate_timeout_ms: u64,
    pub token_page_timeout_ms: u64,
    pub token_submit_timeout_ms: u64,
    pub fallback_timeout_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://eboardresults.com/en".to_string(),
            form_path: "/ebr.app/home/".to_string(),
            alternate_path: "/v2/result".to_string(),
            fallback_urls: vec![
                "https://educationboardresults.gov.bd/api/result".to_string(),
                "https://www.educationboardresults.gov.bd/v2/api/result".to_string(),
            ],
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            form_timeout_ms: 15_000,
            alternate_timeout_ms: 20_000,
            token_page_timeout_ms: 10_000,
            token_submit_timeout_ms: 25_000,
            fallback_timeout_ms: 15_000,
        }
    }
}

impl FetcherConfig {
    /// Absolute URL of the result form
    pub fn form_url(&self) -> String {
        join_path(&self.base_url, &self.form_path)
    }

    /// Absolute URL of the alternate endpoint
    pub fn alternate_url(&self) -> String {
        join_path(&self.base_url, &self.alternate_path)
    }
}

fn join_path(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Backoff schedule between attempts
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Delay after each failed attempt, in milliseconds
    pub backoff_ms: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_ms: vec![1_000, 2_000, 4_000],
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let ms = self
            .backoff_ms
            .get(attempt)
            .or_else(|| self.backoff_ms.last())
            .copied()
            .unwrap_or(0);
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Validity window of a cached record
    pub ttl_hours: u64,

    /// Maximum number of cached records
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            max_entries: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MonitorConfig {
    /// Consecutive failures that move health to `warning`
    pub failure_threshold: u32,

    /// Whether a cache hit counts as a successful request
    pub record_cache_hits: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            record_cache_hits: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Serve the canned record for the demo roll/registration
    pub enabled: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
