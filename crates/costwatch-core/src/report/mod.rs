//! Report assembly: reader → formatter → notifier

mod formatter;
mod pipeline;

pub use formatter::{format_message, render_cost, DATE_FORMAT};
pub use pipeline::BillingReporter;
