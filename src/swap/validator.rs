//! Quote Validator
//!
//! Compares the indicative price shown to the user against the price the
//! aggregator guarantees, and rejects the swap when the two drifted apart by
//! the configured slippage tolerance or more.

use crate::error::{SwapError, SwapResult};

use tracing::warn;

/// Relative difference of two prices in percent, measured against their mean
pub fn percentage_difference(price1: f64, price2: f64) -> f64 {
    ((price1 - price2).abs() / ((price1 + price2) / 2.0)) * 100.0
}

/// True iff the two prices differ by strictly less than `max_slippage_percent`.
///
/// A difference that is not a number (both prices zero) never passes, even
/// though a plain `diff >= max` rejection check would let it through.
pub fn is_within_tolerance(price1: f64, price2: f64, max_slippage_percent: f64) -> bool {
    let diff = percentage_difference(price1, price2);
    if !diff.is_finite() {
        warn!(
            "Price difference between {} and {} is undefined",
            price1, price2
        );
    }
    diff < max_slippage_percent
}

/// Parse a decimal price string from a quote
pub fn parse_price(field: &str, value: &str) -> SwapResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| SwapError::Parse(format!("invalid {} {:?}: {}", field, value, e)))
}

/// Checks quotes against a fixed slippage tolerance
#[derive(Debug, Clone, Copy)]
pub struct QuoteValidator {
    max_slippage_percent: f64,
}

impl QuoteValidator {
    pub fn new(max_slippage_percent: f64) -> Self {
        Self {
            max_slippage_percent,
        }
    }

    pub fn max_slippage_percent(&self) -> f64 {
        self.max_slippage_percent
    }

    /// Validate the indicative price against the guaranteed price
    pub fn validate(&self, price: f64, guaranteed_price: f64) -> bool {
        is_within_tolerance(price, guaranteed_price, self.max_slippage_percent)
    }
}
