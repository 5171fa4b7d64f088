//! # costwatch
//!
//! Daily AWS billing summary delivered to a chat webhook.
//!
//! Once per trigger the function reads the latest daily maximum of the
//! `AWS/Billing` `EstimatedCharges` metric for the account and for every
//! billed service, formats one message and posts it to a LINE Notify style
//! webhook.
//!
//! ## Architecture
//!
//! - **Billing**: CloudWatch reader behind the [`billing::BillingMetrics`] trait
//! - **Report**: message formatting and the invocation pipeline
//! - **Notify**: webhook delivery with contained failures
//! - **Handler**: AWS Lambda entry point
//!
//! ## Quick Start
//!
//! ```bash
//! # Run one report locally, reading LINEPostURL / LINEtoken from .env
//! costwatch run --dry-run
//!
//! # Serve Lambda invocations
//! costwatch lambda
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod billing;
pub mod config;
pub mod error;
pub mod handler;
pub mod models;
pub mod notify;
pub mod report;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::billing::{BillingMetrics, CloudWatchBilling};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::handler::handle_invocation;
    pub use crate::models::*;
    pub use crate::notify::{NotificationResult, Notifier, StdoutNotifier, WebhookNotifier};
    pub use crate::report::BillingReporter;
}
