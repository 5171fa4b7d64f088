//! Lambda entry point
//!
//! The scheduled event payload and invocation context carry nothing the
//! report needs; they are only logged.

use lambda_runtime::LambdaEvent;
use serde_json::Value;
use tracing::info;

use crate::billing::BillingMetrics;
use crate::notify::Notifier;
use crate::report::BillingReporter;

/// Handle one scheduled invocation.
///
/// Reader errors fail the invocation. Delivery failures do not.
pub async fn handle_invocation<M, N>(
    reporter: &BillingReporter<M, N>,
    event: LambdaEvent<Value>,
) -> Result<(), lambda_runtime::Error>
where
    M: BillingMetrics,
    N: Notifier,
{
    let (_payload, context) = event.into_parts();
    info!(request_id = %context.request_id, "Billing report invoked");

    reporter.run().await?;
    Ok(())
}
