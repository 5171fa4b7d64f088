//! Delivery of the billing summary
//!
//! Delivery failures never propagate: a notifier reports the outcome as a
//! [`NotificationResult`] after logging it.

mod notifier;

pub use notifier::{NotificationError, NotificationResult, Notifier, StdoutNotifier, WebhookNotifier};
