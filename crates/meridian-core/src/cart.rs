//! # Cart Totals
//!
//! Plain (non-volume-discount) pricing of a set of lines.
//!
//! ## Totals Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lines ──► Σ pre-volume price × qty ───────► totalValue                 │
//! │        ──► Σ list price × qty ─────────────► totalLP                    │
//! │        ──► Σ shipping × qty ───────────────► totalShipping              │
//! │        ──► Σ totalValue line × P&F % ──────► pfRate                     │
//! │        ──► Σ stacked tax(line + P&F) ──────► totalTax                   │
//! │                                                                         │
//! │  calculatedTotal = value + tax + P&F + shipping + insurance             │
//! │  grandTotal      = calculatedTotal, rounded when enabled                │
//! │  amountDue       = grandTotal - alreadyPaid  (never below zero)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines that already carry a volume-discounted price are valued at list
//! price, so totals do not drift when priced lines are fed back in.

use std::ops::Add;

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::config::PricingSettings;
use crate::money::{Money, Rate};
use crate::tax::line_tax_or_fallback;
use crate::types::{LineItem, TaxScope};

/// Aggregate pricing for one seller group or a whole cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricingResult {
    pub total_items: u32,
    /// Σ line totals before volume discount.
    pub total_value: Money,
    /// Σ list price × quantity.
    #[serde(rename = "totalLP")]
    pub total_lp: Money,
    pub total_tax: Money,
    pub total_shipping: Money,
    pub pf_rate: Money,
    pub insurance_charges: Money,
    pub taxable_amount: Money,
    pub calculated_total: Money,
    pub grand_total: Money,
    pub rounding_adjustment: Money,
    pub already_paid: Money,
    pub amount_due: Money,
}

impl Add for PricingResult {
    type Output = Self;

    fn add(self, o: Self) -> Self {
        PricingResult {
            total_items: self.total_items + o.total_items,
            total_value: self.total_value + o.total_value,
            total_lp: self.total_lp + o.total_lp,
            total_tax: self.total_tax + o.total_tax,
            total_shipping: self.total_shipping + o.total_shipping,
            pf_rate: self.pf_rate + o.pf_rate,
            insurance_charges: self.insurance_charges + o.insurance_charges,
            taxable_amount: self.taxable_amount + o.taxable_amount,
            calculated_total: self.calculated_total + o.calculated_total,
            grand_total: self.grand_total + o.grand_total,
            rounding_adjustment: self.rounding_adjustment + o.rounding_adjustment,
            already_paid: self.already_paid + o.already_paid,
            amount_due: self.amount_due + o.amount_due,
        }
    }
}

/// Charges that sit outside the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CartCharges {
    pub insurance: Money,
    /// P&F charge quoted for the cart; used when settings carry no P&F percent.
    pub pf_rate_base: Money,
    /// Amount settled by earlier partial payments.
    pub already_paid: Money,
}

/// Prices `lines` without volume discount.
///
/// Lines with a zero or missing price contribute nothing; they never fail
/// the batch. Lines without any tax metadata are taxed at
/// `fallback_tax_rate`.
///
/// ```rust
/// use meridian_core::cart::{cart_totals, CartCharges};
/// use meridian_core::config::PricingSettings;
/// use meridian_core::money::Rate;
/// use meridian_core::types::TaxScope;
///
/// let settings = PricingSettings::default();
/// let totals = cart_totals(&[], TaxScope::Inter, &settings, &CartCharges::default(), Rate::ZERO);
/// assert_eq!(totals, Default::default());
/// ```
pub fn cart_totals(
    lines: &[LineItem],
    scope: TaxScope,
    settings: &PricingSettings,
    charges: &CartCharges,
    fallback_tax_rate: Rate,
) -> PricingResult {
    let p = settings.precision;

    let line_values: Vec<Money> = lines
        .iter()
        .map(|line| line.pre_volume_unit_price().times(line.quantity).round_dp(p))
        .collect();
    let total_value: Money = line_values.iter().sum();
    let pf_percentage = settings.effective_pf_percentage(total_value, charges.pf_rate_base);

    let mut totals = PricingResult {
        total_items: u32::try_from(lines.len()).unwrap_or(u32::MAX),
        total_value,
        ..Default::default()
    };

    for (line, value) in lines.iter().zip(line_values) {
        let pf = value.percent(pf_percentage).round_dp(p);
        let shipping = line.shipping_charges.times(line.quantity).round_dp(p);

        let mut tax_base = value + pf;
        if settings.item_wise_shipping_tax {
            tax_base += shipping;
        }

        totals.total_lp += line.unit_list_price.times(line.quantity).round_dp(p);
        totals.pf_rate += pf;
        totals.total_shipping += shipping;
        totals.total_tax +=
            line_tax_or_fallback(line, scope, tax_base, fallback_tax_rate).round_dp(p);
    }

    totals.taxable_amount = totals.total_value + totals.pf_rate;
    if settings.item_wise_shipping_tax {
        totals.taxable_amount += totals.total_shipping;
    }

    totals.insurance_charges = charges.insurance.round_dp(p);
    totals.calculated_total = totals.total_value
        + totals.total_tax
        + totals.pf_rate
        + totals.total_shipping
        + totals.insurance_charges;

    if settings.rounding_adjustment {
        totals.grand_total = totals.calculated_total.round_whole();
        totals.rounding_adjustment = totals.grand_total - totals.calculated_total;
    } else {
        totals.grand_total = totals.calculated_total;
    }

    totals.already_paid = charges.already_paid.round_dp(p);
    let due = totals.grand_total - totals.already_paid;
    totals.amount_due = if due.is_negative() { Money::ZERO } else { due };

    debug!(
        items = totals.total_items,
        total_value = %totals.total_value,
        grand_total = %totals.grand_total,
        "Cart totals computed"
    );

    totals
}
