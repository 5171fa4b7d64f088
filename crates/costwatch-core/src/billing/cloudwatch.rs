//! CloudWatch billing reader
//!
//! Reads `AWS/Billing` `EstimatedCharges` through the AWS SDK. Billing metrics
//! are only published in us-east-1, which is why that is the default region.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatch::config::Region;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Datapoint, Dimension, Metric, Statistic};
use aws_sdk_cloudwatch::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::BillingConfig;
use crate::error::{Error, Result};
use crate::models::{CostScope, MetricStatistic, ServiceName, TimeWindow};

use super::BillingMetrics;

const CURRENCY_DIMENSION: &str = "Currency";
const SERVICE_DIMENSION: &str = "ServiceName";

/// Billing reader backed by the CloudWatch API
#[derive(Debug, Clone)]
pub struct CloudWatchBilling {
    client: Client,
    settings: BillingConfig,
}

impl CloudWatchBilling {
    /// Create a reader around an existing client
    pub fn new(client: Client, settings: BillingConfig) -> Self {
        Self { client, settings }
    }

    /// Create a reader using the default AWS credential chain
    pub async fn from_config(settings: &BillingConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;

        info!(region = %settings.region, "CloudWatch billing reader initialized");

        Self::new(Client::new(&sdk_config), settings.clone())
    }

    async fn max_statistic(&self, scope: CostScope) -> Result<MetricStatistic> {
        let window = TimeWindow::ending_at(Utc::now(), self.settings.period_seconds);

        let mut request = self
            .client
            .get_metric_statistics()
            .namespace(&self.settings.namespace)
            .metric_name(&self.settings.metric_name)
            .dimensions(dimension(CURRENCY_DIMENSION, &self.settings.currency))
            .start_time(to_aws_time(window.start))
            .end_time(to_aws_time(window.end))
            .period(self.settings.period_seconds)
            .statistics(Statistic::Maximum);

        if let Some(service) = scope.service_name() {
            request = request.dimensions(dimension(SERVICE_DIMENSION, service));
        }

        let output = request.send().await?;

        debug!(
            scope = %scope,
            datapoints = output.datapoints().len(),
            "Fetched billing statistics"
        );

        latest_datapoint(scope, output.datapoints(), window)
    }
}

#[async_trait]
impl BillingMetrics for CloudWatchBilling {
    async fn list_services(&self) -> Result<Vec<ServiceName>> {
        let mut pages = self
            .client
            .list_metrics()
            .namespace(&self.settings.namespace)
            .metric_name(&self.settings.metric_name)
            .into_paginator()
            .send();

        let mut services = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page?;
            services.extend(service_names(page.metrics()));
        }

        info!(count = services.len(), "Listed billed services");
        Ok(services)
    }

    async fn total_cost(&self) -> Result<MetricStatistic> {
        self.max_statistic(CostScope::Total).await
    }

    async fn fetch_service_cost(&self, service: &str) -> Result<MetricStatistic> {
        self.max_statistic(CostScope::service(service)).await
    }
}

fn dimension(name: &str, value: &str) -> Dimension {
    Dimension::builder().name(name).value(value).build()
}

/// Service names of metrics whose first dimension is `ServiceName`.
///
/// The per-currency total metric leads with `Currency` and is skipped.
fn service_names<'a>(metrics: impl IntoIterator<Item = &'a Metric>) -> Vec<ServiceName> {
    metrics
        .into_iter()
        .filter_map(|metric| {
            let first = metric.dimensions().first()?;
            if first.name() == Some(SERVICE_DIMENSION) {
                first.value().map(str::to_string)
            } else {
                None
            }
        })
        .collect()
}

/// Pick the datapoint with the latest timestamp; earlier entries win ties.
///
/// Datapoints without a `Maximum` are ignored. A missing timestamp falls back
/// to the start of the query window.
fn latest_datapoint(
    scope: CostScope,
    datapoints: &[Datapoint],
    window: TimeWindow,
) -> Result<MetricStatistic> {
    let mut best: Option<(f64, Option<DateTime<Utc>>)> = None;

    for datapoint in datapoints {
        let Some(maximum) = datapoint.maximum() else {
            continue;
        };
        let timestamp = datapoint.timestamp().and_then(from_aws_time);

        match best {
            Some((_, best_ts)) if timestamp <= best_ts => {}
            _ => best = Some((maximum, timestamp)),
        }
    }

    let Some((maximum, timestamp)) = best else {
        return Err(Error::data_unavailable(scope));
    };

    Ok(MetricStatistic {
        scope,
        maximum,
        timestamp: timestamp.unwrap_or(window.start),
    })
}

fn to_aws_time(time: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_secs(time.timestamp())
}

fn from_aws_time(time: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_cloudwatch::operation::get_metric_statistics::{
        GetMetricStatisticsInput, GetMetricStatisticsOutput,
    };
    use aws_sdk_cloudwatch::operation::list_metrics::ListMetricsOutput;
    use aws_smithy_mocks::{mock, mock_client};
    use chrono::TimeZone;

    fn window() -> TimeWindow {
        TimeWindow::ending_at(Utc.with_ymd_and_hms(2021, 11, 29, 9, 0, 0).unwrap(), 86_400)
    }

    fn datapoint(maximum: Option<f64>, timestamp: Option<DateTime<Utc>>) -> Datapoint {
        let mut builder = Datapoint::builder();
        if let Some(maximum) = maximum {
            builder = builder.maximum(maximum);
        }
        if let Some(timestamp) = timestamp {
            builder = builder.timestamp(to_aws_time(timestamp));
        }
        builder.build()
    }

    fn metric(dimensions: &[(&str, &str)]) -> Metric {
        dimensions
            .iter()
            .fold(
                Metric::builder()
                    .namespace("AWS/Billing")
                    .metric_name("EstimatedCharges"),
                |builder, (name, value)| builder.dimensions(dimension(name, value)),
            )
            .build()
    }

    #[test]
    fn test_service_names_keep_order_and_skip_total() {
        let metrics = vec![
            metric(&[("ServiceName", "AmazonCloudWatch"), ("Currency", "USD")]),
            metric(&[("Currency", "USD")]),
            metric(&[("ServiceName", "AWSSecretsManager"), ("Currency", "USD")]),
            metric(&[("ServiceName", "AmazonRoute53"), ("Currency", "USD")]),
        ];

        assert_eq!(
            service_names(&metrics),
            vec!["AmazonCloudWatch", "AWSSecretsManager", "AmazonRoute53"]
        );
    }

    #[test]
    fn test_service_names_require_leading_service_dimension() {
        let metrics = vec![
            metric(&[("Currency", "USD"), ("ServiceName", "AmazonS3")]),
            metric(&[]),
        ];

        assert!(service_names(&metrics).is_empty());
    }

    #[test]
    fn test_latest_datapoint_single() {
        let ts = Utc.with_ymd_and_hms(2021, 11, 28, 23, 57, 0).unwrap();
        let stat = latest_datapoint(
            CostScope::Total,
            &[datapoint(Some(1.55), Some(ts))],
            window(),
        )
        .unwrap();

        assert_eq!(stat.scope, CostScope::Total);
        assert_eq!(stat.maximum, 1.55);
        assert_eq!(stat.timestamp, ts);
    }

    #[test]
    fn test_latest_datapoint_prefers_newest() {
        let older = Utc.with_ymd_and_hms(2021, 11, 28, 9, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2021, 11, 29, 3, 0, 0).unwrap();

        let stat = latest_datapoint(
            CostScope::service("AmazonS3"),
            &[
                datapoint(Some(0.01), Some(older)),
                datapoint(Some(0.02), Some(newer)),
            ],
            window(),
        )
        .unwrap();

        assert_eq!(stat.maximum, 0.02);
        assert_eq!(stat.timestamp, newer);
    }

    #[test]
    fn test_latest_datapoint_missing_timestamp_uses_window_start() {
        let stat = latest_datapoint(
            CostScope::service("AmazonRoute53"),
            &[datapoint(Some(0.123), None)],
            window(),
        )
        .unwrap();

        assert_eq!(stat.maximum, 0.123);
        assert_eq!(stat.timestamp, window().start);
    }

    #[test]
    fn test_latest_datapoint_empty_is_unavailable() {
        let err = latest_datapoint(CostScope::Total, &[], window()).unwrap_err();
        assert!(matches!(
            err,
            Error::DataUnavailable {
                scope: CostScope::Total
            }
        ));
    }

    #[test]
    fn test_latest_datapoint_without_maximum_is_unavailable() {
        let err = latest_datapoint(
            CostScope::service("awskms"),
            &[datapoint(None, Some(window().end))],
            window(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::DataUnavailable { .. }));
    }

    fn reported_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 11, 28, 23, 57, 0).unwrap()
    }

    fn statistics_output(maximum: f64) -> GetMetricStatisticsOutput {
        GetMetricStatisticsOutput::builder()
            .label("EstimatedCharges")
            .datapoints(datapoint(Some(maximum), Some(reported_at())))
            .build()
    }

    fn has_dimension(dimensions: &[Dimension], name: &str, value: &str) -> bool {
        dimensions
            .iter()
            .any(|d| d.name() == Some(name) && d.value() == Some(value))
    }

    /// Namespace, metric, statistic, period and window every billing query shares
    fn is_daily_maximum(req: &GetMetricStatisticsInput) -> bool {
        let window_seconds = match (req.start_time(), req.end_time()) {
            (Some(start), Some(end)) => end.secs() - start.secs(),
            _ => return false,
        };

        req.namespace() == Some("AWS/Billing")
            && req.metric_name() == Some("EstimatedCharges")
            && req.statistics() == [Statistic::Maximum]
            && req.period() == Some(86_400)
            && window_seconds == 86_400
    }

    fn billing(client: Client) -> CloudWatchBilling {
        CloudWatchBilling::new(client, BillingConfig::default())
    }

    #[tokio::test]
    async fn test_total_query_is_dimensioned_by_currency_only() {
        let rule = mock!(Client::get_metric_statistics)
            .match_requests(|req| {
                is_daily_maximum(req)
                    && req.dimensions().len() == 1
                    && has_dimension(req.dimensions(), "Currency", "USD")
            })
            .then_output(|| statistics_output(1.55));
        let client = mock_client!(aws_sdk_cloudwatch, [&rule]);

        let stat = billing(client).total_cost().await.unwrap();

        assert_eq!(rule.num_calls(), 1);
        assert_eq!(stat.scope, CostScope::Total);
        assert_eq!(stat.maximum, 1.55);
        assert_eq!(stat.timestamp, reported_at());
    }

    #[tokio::test]
    async fn test_service_query_adds_service_dimension() {
        let rule = mock!(Client::get_metric_statistics)
            .match_requests(|req| {
                is_daily_maximum(req)
                    && req.dimensions().len() == 2
                    && has_dimension(req.dimensions(), "Currency", "USD")
                    && has_dimension(req.dimensions(), "ServiceName", "AmazonS3")
            })
            .then_output(|| statistics_output(0.01));
        let client = mock_client!(aws_sdk_cloudwatch, [&rule]);

        let stat = billing(client)
            .service_cost("AmazonS3")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(rule.num_calls(), 1);
        assert_eq!(stat.scope, CostScope::service("AmazonS3"));
        assert_eq!(stat.maximum, 0.01);
    }

    #[tokio::test]
    async fn test_total_pseudo_service_is_never_queried() {
        let rule = mock!(Client::get_metric_statistics).then_output(|| statistics_output(9.99));
        let client = mock_client!(aws_sdk_cloudwatch, [&rule]);

        let stat = billing(client).service_cost("Total").await.unwrap();

        assert!(stat.is_none());
        assert_eq!(rule.num_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_statistics_response_is_unavailable() {
        let rule = mock!(Client::get_metric_statistics)
            .then_output(|| GetMetricStatisticsOutput::builder().build());
        let client = mock_client!(aws_sdk_cloudwatch, [&rule]);

        let err = billing(client).total_cost().await.unwrap_err();

        assert!(matches!(
            err,
            Error::DataUnavailable {
                scope: CostScope::Total
            }
        ));
    }

    #[tokio::test]
    async fn test_list_services_follows_every_page_in_order() {
        let first = mock!(Client::list_metrics)
            .match_requests(|req| {
                req.next_token().is_none()
                    && req.namespace() == Some("AWS/Billing")
                    && req.metric_name() == Some("EstimatedCharges")
            })
            .then_output(|| {
                ListMetricsOutput::builder()
                    .metrics(metric(&[("ServiceName", "AmazonCloudWatch"), ("Currency", "USD")]))
                    .metrics(metric(&[("Currency", "USD")]))
                    .metrics(metric(&[("ServiceName", "AmazonS3"), ("Currency", "USD")]))
                    .next_token("page-2")
                    .build()
            });
        let second = mock!(Client::list_metrics)
            .match_requests(|req| req.next_token() == Some("page-2"))
            .then_output(|| {
                ListMetricsOutput::builder()
                    .metrics(metric(&[("ServiceName", "AWSLambda"), ("Currency", "USD")]))
                    .build()
            });
        let client = mock_client!(aws_sdk_cloudwatch, [&first, &second]);

        let services = billing(client).list_services().await.unwrap();

        assert_eq!(services, vec!["AmazonCloudWatch", "AmazonS3", "AWSLambda"]);
        assert_eq!(first.num_calls(), 1);
        assert_eq!(second.num_calls(), 1);
    }
}
