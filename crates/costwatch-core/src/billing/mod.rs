//! Billing metrics readers
//!
//! A reader answers three questions about the last day of estimated charges:
//! which services were billed, what the account total is, and what each
//! service costs. The CloudWatch reader is the only production source.

mod cloudwatch;

pub use cloudwatch::CloudWatchBilling;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{MetricStatistic, ServiceName, TOTAL_SERVICE_NAME};

/// Source of daily estimated-charge statistics
#[async_trait]
pub trait BillingMetrics: Send + Sync {
    /// Services with billing data, in provider order
    async fn list_services(&self) -> Result<Vec<ServiceName>>;

    /// Latest daily maximum for the whole account
    async fn total_cost(&self) -> Result<MetricStatistic>;

    /// Latest daily maximum for one service, without the `Total` guard
    async fn fetch_service_cost(&self, service: &str) -> Result<MetricStatistic>;

    /// Latest daily maximum for one service.
    ///
    /// Returns `Ok(None)` for the `Total` pseudo-service without querying.
    async fn service_cost(&self, service: &str) -> Result<Option<MetricStatistic>> {
        if service == TOTAL_SERVICE_NAME {
            return Ok(None);
        }
        self.fetch_service_cost(service).await.map(Some)
    }
}
