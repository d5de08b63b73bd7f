//! # Volume Discount Engine
//!
//! Turns tax-annotated lines plus discount data into discounted unit
//! prices, P&F charges, margins and an aggregate [`VdDetails`].
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   calc_tiered ─── TierLookupStrategy ───┐                               │
//! │                                          ├──► calculate() ──► VdDetails │
//! │   calc_embedded ─ EmbeddedObjectStrategy ┘        │                     │
//! │                                                   ▼                     │
//! │                                   apply_discount()  (one line)          │
//! │                                   ├── unit price, rounded               │
//! │                                   ├── total, P&F, taxable amount        │
//! │                                   ├── DMC / margin                      │
//! │                                   └── stacked tax                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding, margin and tax math live only in [`apply_discount`].

mod engine;
mod strategy;

pub use engine::*;
pub use strategy::*;

use rust_decimal::Decimal;

use crate::config::PricingSettings;
use crate::money::{Money, Rate};
use crate::tax::{lacks_tax_data, line_rate, line_tax_or_fallback};
use crate::types::{AdditionalDiscount, Ident, LineItem, TaxScope, VOLUME_DISCOUNT_KIND};

/// Per-run inputs shared by every line.
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    pub scope: TaxScope,
    pub settings: &'a PricingSettings,
    /// P&F percent applied to each line total.
    pub pf_percentage: Rate,
    /// Shipping is charged before tax.
    pub before_tax: bool,
    /// Rate for lines that never received HSN data.
    pub fallback_tax_rate: Rate,
    pub precision: u32,
    /// Back out embedded tax from tax-inclusive list prices.
    pub honor_tax_inclusive: bool,
    /// Write a `volume` audit entry on discounted lines.
    pub record_audit: bool,
}

impl PricingContext<'_> {
    fn ships_before_tax(&self) -> bool {
        self.before_tax && self.settings.item_wise_shipping_tax
    }
}

/// A line after the arithmetic core ran.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub line: LineItem,
    pub pf_rate: Money,
    pub tax_amount: Money,
    /// Line shipping (per-unit charge × quantity).
    pub shipping: Money,
}

/// Rate that applies to `line`, honoring the fallback for lines without
/// any tax metadata.
fn applicable_rate(line: &LineItem, ctx: &PricingContext<'_>) -> Rate {
    if lacks_tax_data(line, ctx.scope) {
        ctx.fallback_tax_rate
    } else {
        line_rate(line, ctx.scope)
    }
}

/// Prices one line at `percent` off.
///
/// ```rust
/// use meridian_core::config::PricingSettings;
/// use meridian_core::discount::{apply_discount, PricingContext};
/// use meridian_core::money::{Money, Rate};
/// use meridian_core::types::{LineItem, TaxScope};
/// use rust_decimal::Decimal;
///
/// let settings = PricingSettings::default();
/// let ctx = PricingContext {
///     scope: TaxScope::Inter,
///     settings: &settings,
///     pf_percentage: Rate::from_percent(Decimal::from(5)),
///     before_tax: false,
///     fallback_tax_rate: Rate::ZERO,
///     precision: 2,
///     honor_tax_inclusive: false,
///     record_audit: false,
/// };
/// let line = LineItem::new(1, Decimal::TEN, Money::from_major(100));
/// let priced = apply_discount(&line, Rate::from_percent(Decimal::TEN), None, &ctx);
///
/// assert_eq!(priced.line.unit_price, Money::from_major(90));
/// assert_eq!(priced.line.total_price, Money::from_major(900));
/// assert_eq!(priced.pf_rate, Money::from_major(45));
/// ```
pub fn apply_discount(
    line: &LineItem,
    percent: Rate,
    discount_id: Option<&Ident>,
    ctx: &PricingContext<'_>,
) -> PricedLine {
    let p = ctx.precision;
    let qty = line.quantity;
    let rate = applicable_rate(line, ctx);

    let base_price = if ctx.honor_tax_inclusive && line.tax_inclusive {
        line.unit_list_price.exclude_tax(rate).round_dp(p)
    } else {
        line.unit_list_price
    };

    let applied = percent.is_positive();
    let unit_price = base_price.apply_percentage_discount(percent).round_dp(p);
    let total_price = unit_price.times(qty).round_dp(p);
    let pf_rate = total_price.percent(ctx.pf_percentage).round_dp(p);
    let shipping = line.shipping_charges.times(qty).round_dp(p);

    let mut item_taxable = unit_price + pf_rate.per(qty);
    if ctx.ships_before_tax() {
        item_taxable += line.shipping_charges;
    }

    let unit_volume_price = if applied { unit_price } else { base_price };
    let total_volume_discount_price = unit_volume_price.times(qty).round_dp(p);

    let (dmc, margin) = margin_of(line.product_cost, line.addon_cost, unit_volume_price, p);

    let mut tax_base = total_price + pf_rate;
    if ctx.ships_before_tax() {
        tax_base += shipping;
    }
    let tax_amount =
        line_tax_or_fallback(line, ctx.scope, tax_base, ctx.fallback_tax_rate).round_dp(p);

    let mut out = line.clone();
    out.unit_price = unit_price;
    out.total_price = total_price;
    out.pf_rate = pf_rate;
    out.item_taxable_amount = item_taxable.round_dp(p);
    out.unit_volume_price = unit_volume_price;
    out.total_volume_discount_price = total_volume_discount_price;
    out.dmc = dmc;
    out.margin_percentage = margin;
    out.tax_volume_discount_percentage = rate.round_dp(p);
    out.line_tax = tax_amount;
    out.volume_discount_applied = applied;
    out.applied_discount = percent;

    if ctx.record_audit {
        out.additional_discounts.retain(|d| d.kind != VOLUME_DISCOUNT_KIND);
        if applied {
            out.additional_discounts.push(AdditionalDiscount {
                kind: VOLUME_DISCOUNT_KIND.to_string(),
                discount_id: discount_id.cloned(),
                percentage: percent,
                amount: (base_price - unit_price).times(qty).round_dp(p),
            });
        }
    }

    PricedLine {
        line: out,
        pf_rate,
        tax_amount,
        shipping,
    }
}

/// `(dmc, margin)` for product plus add-on cost against a unit price.
///
/// An unknown (zero) product cost or a zero price yields `(100, 0)`,
/// whatever the add-on cost.
fn margin_of(
    product_cost: Money,
    addon_cost: Money,
    unit_price: Money,
    precision: u32,
) -> (Rate, Rate) {
    let hundred = Rate::HUNDRED;
    if product_cost.is_zero() {
        return (hundred, Rate::ZERO);
    }
    match (product_cost + addon_cost).share_of(unit_price) {
        Some(share) => {
            let dmc = Rate::from_percent(share).round_dp(precision);
            let margin = Rate::from_percent(Decimal::ONE_HUNDRED.saturating_sub(dmc.percent()));
            (dmc, margin)
        }
        None => (hundred, Rate::ZERO),
    }
}
