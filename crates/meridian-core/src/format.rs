//! # Currency Formatting
//!
//! Renders monetary values for display under the active currency.
//!
//! ## Fallbacks
//! ```text
//! no currency context        → { symbol: "$", decimal: ".", thousand: ",", precision: 2 }
//! null / NaN / ±Infinity     → the formatted zero, e.g. "$0.00"
//! ```
//! A formatter never propagates `NaN` into the UI.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{decimal_from_f64, round_half_up, Money};

/// Currency descriptor supplied by the storefront's locale service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub decimal: String,
    pub thousand: String,
    pub precision: u32,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        CurrencyFormat {
            symbol: "$".to_string(),
            decimal: ".".to_string(),
            thousand: ",".to_string(),
            precision: 2,
        }
    }
}

impl CurrencyFormat {
    /// Formats an exact decimal amount.
    pub fn render(&self, value: Decimal) -> String {
        let rounded = round_half_up(value, self.precision);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let digits = format!("{:.*}", self.precision as usize, rounded.abs());

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (digits.as_str(), None),
        };

        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push_str(&self.symbol);
        out.push_str(&group_thousands(whole, &self.thousand));
        if let Some(frac) = frac.filter(|f| !f.is_empty()) {
            out.push_str(&self.decimal);
            out.push_str(frac);
        }
        out
    }
}

fn group_thousands(whole: &str, separator: &str) -> String {
    let len = whole.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// Formats a raw float from the UI layer.
///
/// ```rust
/// use meridian_core::format::format_amount;
///
/// assert_eq!(format_amount(Some(1234.5), None), "$1,234.50");
/// assert_eq!(format_amount(None, None), "$0.00");
/// assert_eq!(format_amount(Some(f64::NAN), None), "$0.00");
/// ```
pub fn format_amount(value: Option<f64>, currency: Option<&CurrencyFormat>) -> String {
    let value = value.map(decimal_from_f64).unwrap_or_default();
    match currency {
        Some(c) => c.render(value),
        None => CurrencyFormat::default().render(value),
    }
}

/// Formats a [`Money`] amount.
pub fn format_money(value: Money, currency: Option<&CurrencyFormat>) -> String {
    match currency {
        Some(c) => c.render(value.amount()),
        None => CurrencyFormat::default().render(value.amount()),
    }
}
