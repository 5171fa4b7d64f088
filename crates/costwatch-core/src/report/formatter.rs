//! Message formatting
//!
//! ```text
//!
//! 2021年11月28日
//! 0.01$     AmazonS3
//! 0.21$     AmazonRDS
//! 合計1.55$
//! ```

use std::fmt::Write;

use crate::models::CostReport;

/// Header date format
pub const DATE_FORMAT: &str = "%Y年%m月%d日";

const COST_SEPARATOR: &str = "$     ";

/// Render the report as the chat message.
///
/// The header is dated by the total datapoint only.
pub fn format_message(report: &CostReport) -> String {
    let mut message = format!("\n{}", report.total.timestamp.format(DATE_FORMAT));

    for line in &report.services {
        let _ = write!(
            message,
            "\n{}{COST_SEPARATOR}{}",
            render_cost(line.statistic.maximum),
            line.service
        );
    }

    let _ = write!(message, "\n合計{}$", render_cost(report.total.maximum));
    message
}

/// Shortest round-trip decimal.
///
/// Values in `[1e-4, 1e16)` always carry a fractional part (`0.0`, `12.0`).
/// Outside that range the exponent is signed and at least two digits wide
/// (`1e-05`, `1.5e+16`).
pub fn render_cost(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }

    let shortest = format!("{value:?}");
    match shortest.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => shortest,
    }
}
