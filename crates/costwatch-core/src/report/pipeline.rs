//! Invocation pipeline
//!
//! Fetches the account total, then each listed service, formats the message
//! and hands it to the notifier. Reader errors propagate; delivery errors are
//! contained by the notifier.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::billing::BillingMetrics;
use crate::error::Result;
use crate::models::{CostReport, ServiceCost};
use crate::notify::{NotificationResult, Notifier};

use super::formatter::format_message;

/// Long-lived invocation context: one reader, one notifier
pub struct BillingReporter<M, N> {
    metrics: M,
    notifier: N,
    fetch_concurrency: usize,
}

impl<M, N> BillingReporter<M, N>
where
    M: BillingMetrics,
    N: Notifier,
{
    /// Create a reporter that fetches service costs one at a time
    pub fn new(metrics: M, notifier: N) -> Self {
        Self {
            metrics,
            notifier,
            fetch_concurrency: 1,
        }
    }

    /// Allow up to `limit` per-service queries in flight. Line order is kept.
    #[must_use]
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit.max(1);
        self
    }

    /// Fetch everything the message needs
    pub async fn collect(&self) -> Result<CostReport> {
        let total = self.metrics.total_cost().await?;
        let services = self.metrics.list_services().await?;

        debug!(
            services = services.len(),
            concurrency = self.fetch_concurrency,
            "Fetching per-service costs"
        );

        let fetched: Vec<Option<ServiceCost>> = stream::iter(services)
            .map(|service| async move {
                let statistic = self.metrics.service_cost(&service).await?;
                if statistic.is_none() {
                    debug!(service = %service, "Skipping pseudo-service");
                }
                Ok::<_, crate::error::Error>(
                    statistic.map(|statistic| ServiceCost { service, statistic }),
                )
            })
            .buffered(self.fetch_concurrency)
            .try_collect()
            .await?;

        Ok(CostReport {
            total,
            services: fetched.into_iter().flatten().collect(),
        })
    }

    /// Fetch and format the message
    pub async fn build_message(&self) -> Result<String> {
        let report = self.collect().await?;
        Ok(format_message(&report))
    }

    /// Run one invocation
    pub async fn run(&self) -> Result<NotificationResult> {
        let message = self.build_message().await?;
        let result = self.notifier.send(&message).await;

        info!(
            channel = %result.channel_type,
            delivered = result.success,
            "Billing report finished"
        );

        Ok(result)
    }
}
