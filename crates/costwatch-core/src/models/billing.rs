//! Billing data models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a billed AWS service, e.g. `AmazonS3`
pub type ServiceName = String;

/// Pseudo-service the billing namespace may report alongside real services
pub const TOTAL_SERVICE_NAME: &str = "Total";

/// What a billing statistic was measured over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum CostScope {
    /// Whole account, dimensioned by currency only
    Total,
    /// A single service
    Service(ServiceName),
}

impl CostScope {
    /// Scope for a named service
    pub fn service(name: impl Into<ServiceName>) -> Self {
        Self::Service(name.into())
    }

    /// Service name, if this is a per-service scope
    pub fn service_name(&self) -> Option<&str> {
        match self {
            Self::Total => None,
            Self::Service(name) => Some(name),
        }
    }
}

impl fmt::Display for CostScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Total => write!(f, "total"),
            Self::Service(name) => write!(f, "service {name}"),
        }
    }
}

/// Daily maximum of the estimated charges for one scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistic {
    /// Scope the value was measured over
    pub scope: CostScope,

    /// Maximum estimated charge in USD
    pub maximum: f64,

    /// Datapoint timestamp
    pub timestamp: DateTime<Utc>,
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCost {
    /// Billed service
    pub service: ServiceName,

    /// Its latest daily maximum
    pub statistic: MetricStatistic,
}

/// Everything the formatter needs for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    /// Account total; its timestamp dates the report
    pub total: MetricStatistic,

    /// Per-service costs in provider order
    pub services: Vec<ServiceCost>,
}

/// Lookback window for a statistics query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The `period_seconds` ending at `end`
    pub fn ending_at(end: DateTime<Utc>, period_seconds: i32) -> Self {
        Self {
            start: end - chrono::Duration::seconds(i64::from(period_seconds)),
            end,
        }
    }
}
