//! Operational health monitoring
//!
//! Every retrieval outcome is recorded here. The monitor keeps rolling
//! counters, spots captcha-enforcement signatures in failure text, and derives
//! a [`HealthStatus`] from the current counters.

mod alerts;

pub use alerts::{Alert, AlertSink, LogAlertSink};

use crate::cache::CacheStats;
use crate::config::MonitorConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Phrases that suggest the upstream is demanding a human-verification step
const CAPTCHA_KEYWORDS: &[&str] = &[
    "captcha",
    "security code",
    "verification",
    "robot",
    "automated",
    "please enter the code",
    "enter the number",
    "human verification",
];

/// Whether an error message looks like captcha enforcement
pub fn is_captcha_enforcement(message: &str) -> bool {
    let lower = message.to_lowercase();
    CAPTCHA_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Process-wide retrieval counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Running mean in milliseconds
    pub average_response_time: f64,
    /// Reset to zero by any success
    pub consecutive_failures: u32,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_failure_time: Option<DateTime<Utc>>,
    /// Sticky; only [`Monitor::reset_metrics`] clears it
    pub captcha_enforcement_detected: bool,
}

/// Derived health of the retrieval service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Operator guidance for this status
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            Self::Critical => &[
                "Captcha enforcement detected on official site",
                "Consider implementing captcha solving service",
                "Look for alternative data sources",
                "Monitor official site for changes",
            ],
            Self::Warning => &[
                "Multiple consecutive failures detected",
                "Check if official site has changed",
                "Consider implementing retry logic with delays",
                "Monitor for captcha enforcement",
            ],
            Self::Healthy => &[
                "System is healthy",
                "Continue monitoring for changes",
                "Consider implementing additional fallback sources",
            ],
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Full health snapshot for an operator view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub is_healthy: bool,
    pub metrics: HealthMetrics,
    pub success_rate: f64,
    pub cache: CacheStats,
    pub recommendations: Vec<&'static str>,
}

/// Records retrieval outcomes and reports health
pub struct Monitor {
    metrics: Mutex<HealthMetrics>,
    failure_threshold: u32,
    sink: Arc<dyn AlertSink>,
}

impl Monitor {
    pub fn new(failure_threshold: u32) -> Self {
        Self::with_sink(failure_threshold, Arc::new(LogAlertSink))
    }

    pub fn with_sink(failure_threshold: u32, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            metrics: Mutex::new(HealthMetrics::default()),
            failure_threshold,
            sink,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.failure_threshold)
    }

    fn lock(&self) -> MutexGuard<'_, HealthMetrics> {
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records one retrieval outcome
    ///
    /// `error` is only inspected for failures. Alerts are dispatched after
    /// the counters are updated and the lock is released.
    pub fn record_request(&self, success: bool, elapsed_ms: u64, error: Option<&str>) {
        let mut alerts = Vec::new();
        {
            let mut metrics = self.lock();
            let now = Utc::now();
            metrics.total_requests += 1;

            if success {
                metrics.successful_requests += 1;
                metrics.consecutive_failures = 0;
                metrics.last_success_time = Some(now);
            } else {
                metrics.failed_requests += 1;
                metrics.consecutive_failures += 1;
                metrics.last_failure_time = Some(now);

                // Alert once per detection; the flag stays set until reset
                if error.is_some_and(is_captcha_enforcement)
                    && !metrics.captcha_enforcement_detected
                {
                    metrics.captcha_enforcement_detected = true;
                    alerts.push(Alert::CaptchaEnforcement { detected_at: now });
                }
            }

            // total_requests is already incremented, so n - 1 prior samples
            let n = metrics.total_requests as f64;
            metrics.average_response_time =
                (metrics.average_response_time * (n - 1.0) + elapsed_ms as f64) / n;

            if metrics.consecutive_failures >= self.failure_threshold {
                alerts.push(Alert::ConsecutiveFailures {
                    count: metrics.consecutive_failures,
                    last_failure: metrics.last_failure_time,
                });
            }
        }

        for alert in &alerts {
            self.sink.send(alert);
        }
    }

    pub fn metrics(&self) -> HealthMetrics {
        self.lock().clone()
    }

    /// Percentage of recorded requests that succeeded, 0 when none were recorded
    pub fn success_rate(&self) -> f64 {
        let metrics = self.lock();
        if metrics.total_requests == 0 {
            return 0.0;
        }
        metrics.successful_requests as f64 / metrics.total_requests as f64 * 100.0
    }

    pub fn health_status(&self) -> HealthStatus {
        let metrics = self.lock();
        if metrics.captcha_enforcement_detected {
            HealthStatus::Critical
        } else if metrics.consecutive_failures >= self.failure_threshold {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health_status() == HealthStatus::Healthy
    }

    /// Clears every counter and the captcha flag
    pub fn reset_metrics(&self) {
        *self.lock() = HealthMetrics::default();
        tracing::info!("Monitoring metrics reset");
    }

    pub fn report(&self, cache: CacheStats) -> HealthReport {
        let status = self.health_status();
        HealthReport {
            status,
            is_healthy: status == HealthStatus::Healthy,
            metrics: self.metrics(),
            success_rate: self.success_rate(),
            cache,
            recommendations: status.recommendations().to_vec(),
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("metrics", &*self.lock())
            .field("failure_threshold", &self.failure_threshold)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        alerts: Mutex<Vec<Alert>>,
    }

    impl AlertSink for RecordingSink {
        fn send(&self, alert: &Alert) {
            self.alerts.lock().unwrap().push(alert.clone());
        }
    }

    #[test]
    fn test_new_monitor_is_healthy() {
        let monitor = Monitor::default();
        assert_eq!(monitor.health_status(), HealthStatus::Healthy);
        assert!(monitor.is_healthy());
        assert_eq!(monitor.success_rate(), 0.0);
    }

    #[test]
    fn test_success_rate() {
        let monitor = Monitor::default();
        monitor.record_request(true, 100, None);
        monitor.record_request(true, 100, None);
        monitor.record_request(true, 100, None);
        monitor.record_request(false, 100, Some("timeout"));
        assert_eq!(monitor.success_rate(), 75.0);
    }

    #[test]
    fn test_five_consecutive_failures_warn() {
        let monitor = Monitor::default();
        for _ in 0..4 {
            monitor.record_request(false, 10, Some("Network error: Request timeout"));
        }
        assert_eq!(monitor.health_status(), HealthStatus::Healthy);

        monitor.record_request(false, 10, Some("Network error: Request timeout"));
        assert_eq!(monitor.health_status(), HealthStatus::Warning);
        assert!(!monitor.is_healthy());
    }

    #[test]
    fn test_success_resets_streak() {
        let monitor = Monitor::default();
        for _ in 0..5 {
            monitor.record_request(false, 10, None);
        }
        monitor.record_request(true, 10, None);

        assert_eq!(monitor.metrics().consecutive_failures, 0);
        assert_eq!(monitor.health_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_captcha_is_sticky_until_reset() {
        let monitor = Monitor::default();
        monitor.record_request(false, 10, Some("Please solve the CAPTCHA to continue"));
        assert_eq!(monitor.health_status(), HealthStatus::Critical);

        for _ in 0..10 {
            monitor.record_request(true, 10, None);
        }
        assert_eq!(monitor.health_status(), HealthStatus::Critical);

        monitor.reset_metrics();
        assert_eq!(monitor.health_status(), HealthStatus::Healthy);
        assert_eq!(monitor.metrics(), HealthMetrics::default());
    }

    #[test]
    fn test_captcha_keywords_ignored_on_success() {
        let monitor = Monitor::default();
        monitor.record_request(true, 10, Some("captcha"));
        assert!(!monitor.metrics().captcha_enforcement_detected);
    }

    #[test]
    fn test_captcha_keyword_detection() {
        assert!(is_captcha_enforcement("Enter the Security Code shown"));
        assert!(is_captcha_enforcement("Human Verification required"));
        assert!(is_captcha_enforcement("Are you a robot?"));
        assert!(!is_captcha_enforcement("Result not found"));
    }

    #[test]
    fn test_incremental_average() {
        let monitor = Monitor::default();
        monitor.record_request(true, 100, None);
        monitor.record_request(true, 200, None);
        monitor.record_request(false, 600, None);
        assert!((monitor.metrics().average_response_time - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_counters_and_timestamps() {
        let monitor = Monitor::default();
        monitor.record_request(true, 1, None);
        monitor.record_request(false, 1, None);

        let metrics = monitor.metrics();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.failed_requests, 1);
        assert!(metrics.last_success_time.is_some());
        assert!(metrics.last_failure_time.is_some());
    }

    #[test]
    fn test_alerts_dispatched() {
        let sink = Arc::new(RecordingSink::default());
        let monitor = Monitor::with_sink(2, sink.clone());

        monitor.record_request(false, 1, Some("robot check"));
        monitor.record_request(false, 1, None);

        let alerts = sink.alerts.lock().unwrap();
        assert!(matches!(alerts[0], Alert::CaptchaEnforcement { .. }));
        assert!(matches!(alerts[1], Alert::ConsecutiveFailures { count: 2, .. }));
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn test_captcha_alert_sent_once_per_detection() {
        let sink = Arc::new(RecordingSink::default());
        let monitor = Monitor::with_sink(100, sink.clone());

        monitor.record_request(false, 1, Some("captcha required"));
        monitor.record_request(false, 1, Some("captcha required"));
        assert_eq!(sink.alerts.lock().unwrap().len(), 1);

        // A reset clears the flag, so the next sighting is new again
        monitor.reset_metrics();
        monitor.record_request(false, 1, Some("Enter the security code"));

        let alerts = sink.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 2);
        assert!(alerts
            .iter()
            .all(|alert| matches!(alert, Alert::CaptchaEnforcement { .. })));
    }

    #[test]
    fn test_report_recommendations_follow_status() {
        let monitor = Monitor::default();
        let report = monitor.report(CacheStats {
            size: 0,
            entries: vec![],
        });
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.is_healthy);
        assert_eq!(report.recommendations[0], "System is healthy");

        monitor.record_request(false, 1, Some("captcha"));
        let report = monitor.report(CacheStats {
            size: 1,
            entries: vec!["k".to_string()],
        });
        assert_eq!(report.status, HealthStatus::Critical);
        assert_eq!(report.cache.size, 1);
        assert_eq!(report.recommendations.len(), 4);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(HealthStatus::Warning.to_string(), "warning");
    }
}
