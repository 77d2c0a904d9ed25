//! Budget threshold alerts and their delivery.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::Result;

/// Which threshold was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Daily spend above 80% of the daily limit.
    Daily,
    /// Daily spend above the daily limit.
    DailyExceeded,
    /// Monthly spend above 90% of the monthly limit.
    Monthly,
    /// Monthly spend above the monthly limit.
    MonthlyExceeded,
}

impl AlertKind {
    pub const ALL: [AlertKind; 4] = [
        Self::Daily,
        Self::DailyExceeded,
        Self::Monthly,
        Self::MonthlyExceeded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::DailyExceeded => "daily_exceeded",
            Self::Monthly => "monthly",
            Self::MonthlyExceeded => "monthly_exceeded",
        }
    }

    /// Fraction of the limit that must be exceeded to raise this alert.
    pub fn threshold(&self) -> f64 {
        match self {
            Self::Daily => 0.8,
            Self::Monthly => 0.9,
            Self::DailyExceeded | Self::MonthlyExceeded => 1.0,
        }
    }

    pub fn severity(&self) -> AlertSeverity {
        match self {
            Self::Daily | Self::Monthly => AlertSeverity::Warning,
            Self::DailyExceeded | Self::MonthlyExceeded => AlertSeverity::Urgent,
        }
    }

    pub fn is_daily(&self) -> bool {
        matches!(self, Self::Daily | Self::DailyExceeded)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Urgent,
}

/// A raised budget alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    /// Calendar bucket the alert applies to: `YYYY-MM-DD` or `YYYY-MM`.
    pub period: String,
    pub current_cost_usd: f64,
    pub limit_usd: f64,
    pub raised_at: DateTime<Utc>,
}

impl CostAlert {
    /// Share of the limit spent, as a percentage.
    pub fn percent_used(&self) -> f64 {
        if self.limit_usd > 0.0 {
            self.current_cost_usd / self.limit_usd * 100.0
        } else {
            0.0
        }
    }
}

impl fmt::Display for CostAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} budget alert for {}: ${:.2} of ${:.2} ({:.1}%)",
            self.kind,
            self.period,
            self.current_cost_usd,
            self.limit_usd,
            self.percent_used()
        )
    }
}

/// Destination for budget alerts (ops channel, pager, mailer).
///
/// Delivery errors are logged by the tracker and never reach the caller
/// whose usage triggered the alert.
pub trait AlertSink: Send + Sync {
    fn notify(&self, alert: &CostAlert) -> Result<()>;
}

/// Default sink: emits each alert as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn notify(&self, alert: &CostAlert) -> Result<()> {
        match alert.severity {
            AlertSeverity::Warning => warn!(
                kind = alert.kind.as_str(),
                period = %alert.period,
                current_usd = alert.current_cost_usd,
                limit_usd = alert.limit_usd,
                "budget threshold crossed"
            ),
            AlertSeverity::Urgent => error!(
                kind = alert.kind.as_str(),
                period = %alert.period,
                current_usd = alert.current_cost_usd,
                limit_usd = alert.limit_usd,
                "budget limit exceeded"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeded_kinds_are_urgent() {
        assert_eq!(AlertKind::DailyExceeded.severity(), AlertSeverity::Urgent);
        assert_eq!(AlertKind::Monthly.severity(), AlertSeverity::Warning);
        assert!(AlertKind::DailyExceeded.is_daily());
        assert!(!AlertKind::MonthlyExceeded.is_daily());
    }

    #[test]
    fn alert_display_includes_percentage() {
        let alert = CostAlert {
            kind: AlertKind::Daily,
            severity: AlertSeverity::Warning,
            period: "2026-03-14".into(),
            current_cost_usd: 45.0,
            limit_usd: 50.0,
            raised_at: Utc::now(),
        };
        assert_eq!(
            alert.to_string(),
            "daily budget alert for 2026-03-14: $45.00 of $50.00 (90.0%)"
        );
    }
}
