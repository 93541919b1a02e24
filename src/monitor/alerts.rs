//! Alert hook for operational conditions
//!
//! The monitor hands alerts to an [`AlertSink`]. The default sink writes them
//! to the log; deployments can plug in email, SMS or webhook delivery.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// A condition worth telling an operator about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Alert {
    /// The consecutive-failure streak reached the threshold
    ConsecutiveFailures {
        count: u32,
        last_failure: Option<DateTime<Utc>>,
    },

    /// A failure message looked like the upstream asking for a captcha
    CaptchaEnforcement { detected_at: DateTime<Utc> },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConsecutiveFailures { count, .. } => {
                write!(f, "{} consecutive failures detected", count)
            }
            Self::CaptchaEnforcement { .. } => {
                write!(f, "Captcha enforcement detected on the upstream site")
            }
        }
    }
}

/// Destination for monitor alerts
pub trait AlertSink: Send + Sync {
    fn send(&self, alert: &Alert);
}

/// Writes alerts to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn send(&self, alert: &Alert) {
        match alert {
            Alert::ConsecutiveFailures {
                count,
                last_failure,
            } => {
                tracing::error!(
                    count = *count,
                    last_failure = ?last_failure,
                    "ALERT: {} consecutive failures; the upstream site may have changed its behaviour",
                    count
                );
            }
            Alert::CaptchaEnforcement { detected_at } => {
                tracing::error!(
                    detected_at = %detected_at,
                    "CRITICAL ALERT: captcha enforcement detected; retrieval may stop working, \
                     look for alternative data sources"
                );
            }
        }
    }
}
