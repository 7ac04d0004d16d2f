//! CloudWatch implementation of the publishing boundary

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum as CwMetricDatum, StandardUnit};
use tracing::debug;

use super::{MetricPublisher, NAMESPACE};
use crate::models::MetricDatum;

/// Publishes each batch with a single `PutMetricData` call under the fixed
/// namespace.
///
/// Batches are sent as-is: a batch exceeding the backend's payload limit is
/// rejected there and surfaces as a tick-level publish error.
pub struct CloudWatchPublisher {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchPublisher {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricPublisher for CloudWatchPublisher {
    async fn publish(&self, batch: &[MetricDatum]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut request = self.client.put_metric_data().namespace(NAMESPACE);
        for datum in batch {
            request = request.metric_data(to_sdk_datum(datum)?);
        }
        request.send().await.context("PutMetricData call failed")?;

        debug!(batch_size = batch.len(), "Published metric batch");
        Ok(())
    }
}

fn to_sdk_datum(datum: &MetricDatum) -> Result<CwMetricDatum> {
    let mut builder = CwMetricDatum::builder()
        .metric_name(datum.metric_name.as_str())
        .unit(StandardUnit::from(datum.unit.as_str()))
        .value(datum.value)
        .timestamp(DateTime::from_secs(datum.timestamp.timestamp()));

    for dimension in &datum.dimensions {
        builder = builder.dimensions(
            Dimension::builder()
                .name(dimension.name.as_str())
                .value(dimension.value.as_str())
                .build(),
        );
    }

    Ok(builder.build())
}

/// AWS region embedded in a task ARN
/// (`arn:aws:ecs:<region>:<account>:task/...`).
pub fn region_from_task_arn(task_arn: &str) -> Option<&str> {
    match task_arn.split(':').nth(3) {
        Some("") | None => None,
        Some(region) => Some(region),
    }
}
