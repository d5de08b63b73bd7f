//! # Pricing Settings
//!
//! Tenant-level switches that shape the pricing math.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority, applied by the CLI)       │
//! │     MERIDIAN_PRECISION=3                                               │
//! │     MERIDIAN_PF_PERCENTAGE=5                                           │
//! │     MERIDIAN_ROUNDING=true                                             │
//! │                                                                         │
//! │  2. TOML settings text (parsed here, read from disk by the CLI)        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     precision 2, no P&F override, no rounding adjustment               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settings File Format
//! ```toml
//! pf_percentage = 5
//! item_wise_shipping_tax = true
//! rounding_adjustment = true
//! precision = 2
//!
//! [currency]
//! symbol = "₹"
//! decimal = "."
//! thousand = ","
//! precision = 2
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::CoreResult;
use crate::format::CurrencyFormat;
use crate::money::{Money, Rate};
use crate::validation::{validate_currency, validate_percentage, validate_precision};
use crate::DEFAULT_PRECISION;

/// Pricing switches for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct PricingSettings {
    /// Packaging & forwarding surcharge as a percent of line total.
    ///
    /// When absent, the engine derives it from the caller's P&F base.
    #[serde(alias = "pfPercentage")]
    pub pf_percentage: Option<Rate>,

    /// Shipping is taxed per item and folded into the taxable amount.
    #[serde(alias = "itemWiseShippingTax")]
    pub item_wise_shipping_tax: bool,

    /// Round the grand total to whole units and record the difference.
    #[serde(alias = "roundingAdjustment")]
    pub rounding_adjustment: bool,

    /// Decimal places at every monetary boundary.
    pub precision: u32,

    pub currency: CurrencyFormat,
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            pf_percentage: None,
            item_wise_shipping_tax: false,
            rounding_adjustment: false,
            precision: DEFAULT_PRECISION,
            currency: CurrencyFormat::default(),
        }
    }
}

impl PricingSettings {
    /// Parses and validates settings from TOML text.
    ///
    /// ```rust
    /// use meridian_core::config::PricingSettings;
    ///
    /// let settings = PricingSettings::from_toml_str("pf_percentage = 5\nprecision = 3").unwrap();
    /// assert_eq!(settings.precision, 3);
    /// assert!(!settings.rounding_adjustment);
    /// ```
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let settings: PricingSettings = toml::from_str(text)?;
        settings.validate()?;
        debug!(
            precision = settings.precision,
            rounding = settings.rounding_adjustment,
            "Pricing settings parsed"
        );
        Ok(settings)
    }

    /// Checks ranges; see [`crate::validation`].
    pub fn validate(&self) -> CoreResult<()> {
        validate_precision(self.precision)?;
        if let Some(pf) = self.pf_percentage {
            validate_percentage("pf_percentage", pf)?;
        }
        validate_currency(&self.currency)?;
        Ok(())
    }

    /// P&F percent to apply to line totals.
    ///
    /// Uses the configured percentage, else `pf_rate_base / sub_total`.
    /// A zero subtotal yields 0%.
    pub fn effective_pf_percentage(&self, sub_total: Money, pf_rate_base: Money) -> Rate {
        if let Some(pf) = self.pf_percentage {
            return pf;
        }
        pf_rate_base
            .share_of(sub_total)
            .map(Rate::from_percent)
            .unwrap_or(Rate::ZERO)
    }
}
