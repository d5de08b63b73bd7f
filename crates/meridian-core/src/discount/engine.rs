//! Mode A / Mode B drivers and the aggregate [`VdDetails`].

use std::ops::Add;

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use super::strategy::{DiscountStrategy, EmbeddedObjectStrategy, TierLookupStrategy};
use super::{apply_discount, PricingContext};
use crate::cart::PricingResult;
use crate::config::PricingSettings;
use crate::money::{Money, Rate};
use crate::types::{LineItem, TaxScope, VolumeDiscountTier};

/// Volume-discount view of a cart or seller group.
///
/// When volume discount is active every consumer of totals reads this
/// instead of the plain [`PricingResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VdDetails {
    /// Pre-discount subtotal, as supplied by the caller.
    pub sub_total: Money,
    /// Σ discounted line totals.
    pub sub_total_volume: Money,
    /// Money saved: `sub_total - sub_total_volume`.
    pub volume_discount_applied: Money,
    pub pf_rate: Money,
    pub overall_shipping: Money,
    pub overall_tax: Money,
    pub taxable_amount: Money,
    pub insurance_charges: Money,
    pub calculated_total: Money,
    pub grand_total: Money,
    pub rounding_adjustment: Money,
}

impl VdDetails {
    /// Expresses a group priced without volume discount in VD terms, so
    /// mixed carts can be merged into one VD view.
    pub fn from_cart(cart: &PricingResult) -> Self {
        VdDetails {
            sub_total: cart.total_value,
            sub_total_volume: cart.total_value,
            volume_discount_applied: Money::ZERO,
            pf_rate: cart.pf_rate,
            overall_shipping: cart.total_shipping,
            overall_tax: cart.total_tax,
            taxable_amount: cart.taxable_amount,
            insurance_charges: cart.insurance_charges,
            calculated_total: cart.calculated_total,
            grand_total: cart.grand_total,
            rounding_adjustment: cart.rounding_adjustment,
        }
    }
}

impl Add for VdDetails {
    type Output = Self;

    fn add(self, o: Self) -> Self {
        VdDetails {
            sub_total: self.sub_total + o.sub_total,
            sub_total_volume: self.sub_total_volume + o.sub_total_volume,
            volume_discount_applied: self.volume_discount_applied + o.volume_discount_applied,
            pf_rate: self.pf_rate + o.pf_rate,
            overall_shipping: self.overall_shipping + o.overall_shipping,
            overall_tax: self.overall_tax + o.overall_tax,
            taxable_amount: self.taxable_amount + o.taxable_amount,
            insurance_charges: self.insurance_charges + o.insurance_charges,
            calculated_total: self.calculated_total + o.calculated_total,
            grand_total: self.grand_total + o.grand_total,
            rounding_adjustment: self.rounding_adjustment + o.rounding_adjustment,
        }
    }
}

/// How the grand total is closed out.
///
/// The two modes disagree on purpose and are kept apart:
/// tiered totals carry neither insurance nor rounding, embedded totals
/// carry both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalsPolicy {
    /// `grand = subTotalVolume + tax + pf + shipping`.
    Tiered,
    /// `calculated = … + insurance`, then optional whole-unit rounding.
    Embedded,
}

/// Inputs for one volume-discount run.
#[derive(Debug, Clone, Copy)]
pub struct VolumeDiscountParams<'a> {
    pub is_inter: bool,
    /// Pre-discount subtotal of the lines.
    pub sub_total: Money,
    /// P&F charge before discount; used to derive the P&F percent when
    /// settings carry none.
    pub pf_rate_base: Money,
    /// Only read under [`TotalsPolicy::Embedded`].
    pub insurance_charges: Money,
    pub settings: &'a PricingSettings,
    pub before_tax: bool,
    /// Rate for lines that never received HSN data.
    pub tax_rate_percent: Rate,
    pub precision: u32,
}

impl<'a> VolumeDiscountParams<'a> {
    /// Params with zero amounts and the settings' precision.
    pub fn new(settings: &'a PricingSettings, is_inter: bool) -> Self {
        VolumeDiscountParams {
            is_inter,
            sub_total: Money::ZERO,
            pf_rate_base: Money::ZERO,
            insurance_charges: Money::ZERO,
            settings,
            before_tax: false,
            tax_rate_percent: Rate::ZERO,
            precision: settings.precision,
        }
    }
}

/// Result of a volume-discount run.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeDiscountOutcome {
    pub lines: Vec<LineItem>,
    pub vd_details: VdDetails,
    /// Σ line P&F.
    pub pf_rate: Money,
}

/// Mode A: percentages from an external tier list.
///
/// ```rust
/// use meridian_core::config::PricingSettings;
/// use meridian_core::discount::{calc_tiered, VolumeDiscountParams};
/// use meridian_core::money::{Money, Rate};
/// use meridian_core::types::{LineItem, VolumeDiscountTier};
/// use rust_decimal::Decimal;
///
/// let settings = PricingSettings::default();
/// let mut params = VolumeDiscountParams::new(&settings, true);
/// params.sub_total = Money::from_major(1000);
/// params.pf_rate_base = Money::from_major(50);
///
/// let lines = vec![LineItem::new(1, Decimal::TEN, Money::from_major(100))];
/// let tiers = vec![VolumeDiscountTier {
///     product_id: Some(1.into()),
///     applied_discount: Rate::from_percent(Decimal::TEN),
///     ..Default::default()
/// }];
///
/// let out = calc_tiered(&lines, &tiers, &params);
/// assert_eq!(out.vd_details.sub_total_volume, Money::from_major(900));
/// assert_eq!(out.vd_details.volume_discount_applied, Money::from_major(100));
/// assert_eq!(out.pf_rate, Money::from_major(45));
/// ```
pub fn calc_tiered(
    lines: &[LineItem],
    tiers: &[VolumeDiscountTier],
    params: &VolumeDiscountParams<'_>,
) -> VolumeDiscountOutcome {
    let strategy = TierLookupStrategy::new(tiers);
    calculate(&strategy, lines, params, TotalsPolicy::Tiered)
}

/// Mode B: percentages from each line's embedded discount object.
pub fn calc_embedded(lines: &[LineItem], params: &VolumeDiscountParams<'_>) -> VolumeDiscountOutcome {
    calculate(&EmbeddedObjectStrategy, lines, params, TotalsPolicy::Embedded)
}

/// Runs `strategy` over `lines` and aggregates under `policy`.
pub fn calculate<S: DiscountStrategy>(
    strategy: &S,
    lines: &[LineItem],
    params: &VolumeDiscountParams<'_>,
    policy: TotalsPolicy,
) -> VolumeDiscountOutcome {
    let p = params.precision;
    let ctx = PricingContext {
        scope: TaxScope::from_is_inter(params.is_inter),
        settings: params.settings,
        pf_percentage: params
            .settings
            .effective_pf_percentage(params.sub_total, params.pf_rate_base),
        before_tax: params.before_tax,
        fallback_tax_rate: params.tax_rate_percent,
        precision: p,
        honor_tax_inclusive: strategy.backs_out_inclusive_tax(),
        record_audit: strategy.records_audit_entry(),
    };

    let mut priced_lines = Vec::with_capacity(lines.len());
    let mut sub_total_volume = Money::ZERO;
    let mut pf_rate = Money::ZERO;
    let mut overall_tax = Money::ZERO;
    let mut overall_shipping = Money::ZERO;

    for line in lines {
        let resolution = strategy.resolve(line);
        let priced = apply_discount(line, resolution.percent, resolution.discount_id.as_ref(), &ctx);

        sub_total_volume += priced.line.total_price;
        pf_rate += priced.pf_rate;
        overall_tax += priced.tax_amount;
        overall_shipping += priced.shipping;
        priced_lines.push(priced.line);
    }

    let mut taxable_amount = sub_total_volume + pf_rate;
    if params.before_tax {
        taxable_amount += overall_shipping;
    }

    let base_total = sub_total_volume + overall_tax + pf_rate + overall_shipping;
    let (insurance_charges, calculated_total, grand_total, rounding_adjustment) = match policy {
        TotalsPolicy::Tiered => (Money::ZERO, base_total, base_total, Money::ZERO),
        TotalsPolicy::Embedded => {
            let insurance = params.insurance_charges.round_dp(p);
            let calculated = base_total + insurance;
            if params.settings.rounding_adjustment {
                let grand = calculated.round_whole();
                (insurance, calculated, grand, grand - calculated)
            } else {
                (insurance, calculated, calculated, Money::ZERO)
            }
        }
    };

    let vd_details = VdDetails {
        sub_total: params.sub_total,
        sub_total_volume,
        volume_discount_applied: params.sub_total - sub_total_volume,
        pf_rate,
        overall_shipping,
        overall_tax,
        taxable_amount,
        insurance_charges,
        calculated_total,
        grand_total,
        rounding_adjustment,
    };

    debug!(
        lines = priced_lines.len(),
        ?policy,
        sub_total_volume = %sub_total_volume,
        grand_total = %grand_total,
        "Volume discount computed"
    );

    VolumeDiscountOutcome {
        lines: priced_lines,
        vd_details,
        pf_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ident, VolumeDiscountObj, VOLUME_DISCOUNT_KIND};
    use rust_decimal::Decimal;

    fn pct(n: i64) -> Rate {
        Rate::from_percent(Decimal::from(n))
    }

    fn tier(product: i64, discount: i64) -> VolumeDiscountTier {
        VolumeDiscountTier {
            product_id: Some(Ident::Number(product)),
            applied_discount: pct(discount),
            ..Default::default()
        }
    }

    #[test]
    fn test_tiered_reference_scenario() {
        let settings = PricingSettings::default();
        let mut params = VolumeDiscountParams::new(&settings, true);
        params.sub_total = Money::from_major(1000);
        params.pf_rate_base = Money::from_major(50);
        params.tax_rate_percent = pct(10);

        let lines = vec![LineItem::new(1, Decimal::TEN, Money::from_major(100))];
        let out = calc_tiered(&lines, &[tier(1, 10)], &params);

        let line = &out.lines[0];
        assert_eq!(line.unit_price, Money::from_major(90));
        assert_eq!(line.total_price, Money::from_major(900));
        assert_eq!(line.pf_rate, Money::from_major(45));
        assert!(line.volume_discount_applied);

        let vd = out.vd_details;
        assert_eq!(vd.sub_total, Money::from_major(1000));
        assert_eq!(vd.sub_total_volume, Money::from_major(900));
        assert_eq!(vd.volume_discount_applied, Money::from_major(100));
        assert_eq!(vd.pf_rate, Money::from_major(45));
        // 10% fallback on 945
        assert_eq!(vd.overall_tax, Money::new("94.5".parse().unwrap()));
        assert_eq!(vd.grand_total, Money::new("1039.5".parse().unwrap()));
        assert_eq!(vd.calculated_total, vd.grand_total);
        assert!(vd.rounding_adjustment.is_zero());
    }

    #[test]
    fn test_tiered_ignores_insurance_and_rounding() {
        let settings = PricingSettings {
            rounding_adjustment: true,
            pf_percentage: Some(Rate::ZERO),
            ..Default::default()
        };
        let mut params = VolumeDiscountParams::new(&settings, true);
        params.sub_total = Money::new("10.4".parse().unwrap());
        params.insurance_charges = Money::from_major(7);

        let lines = vec![LineItem::new(1, Decimal::ONE, Money::new("10.4".parse().unwrap()))];
        let out = calc_tiered(&lines, &[], &params);
        assert_eq!(out.vd_details.grand_total, Money::new("10.4".parse().unwrap()));
        assert!(out.vd_details.insurance_charges.is_zero());
    }

    #[test]
    fn test_untiered_line_keeps_list_price() {
        let settings = PricingSettings::default();
        let params = VolumeDiscountParams::new(&settings, false);
        let lines = vec![
            LineItem::new(1, Decimal::ONE, Money::from_major(10)),
            LineItem::new(2, Decimal::ONE, Money::from_major(20)),
        ];
        let out = calc_tiered(&lines, &[tier(1, 50)], &params);
        assert_eq!(out.lines[1].unit_price, Money::from_major(20));
        assert!(!out.lines[1].volume_discount_applied);
        assert!(out.lines[1].applied_discount.is_zero());
    }

    fn embedded_line(cannot_combine: bool, changed: bool) -> LineItem {
        let mut line = LineItem::new(1, Decimal::from(3), Money::new("33.5".parse().unwrap()));
        line.volume_discount_obj = Some(VolumeDiscountObj {
            discount_id: Some(Ident::Number(77)),
            percentage: pct(10),
            cannot_combine_with_other_discounts: cannot_combine,
            disc_changed: changed,
        });
        line
    }

    #[test]
    fn test_embedded_rounding_and_insurance() {
        let settings = PricingSettings {
            rounding_adjustment: true,
            pf_percentage: Some(Rate::ZERO),
            ..Default::default()
        };
        let mut params = VolumeDiscountParams::new(&settings, true);
        params.sub_total = Money::new("100.5".parse().unwrap());
        params.insurance_charges = Money::from_major(2);

        let out = calc_embedded(&[embedded_line(false, false)], &params);
        let vd = out.vd_details;
        // 33.5 × 0.9 = 30.15; × 3 = 90.45; + insurance 2 = 92.45
        assert_eq!(vd.sub_total_volume, Money::new("90.45".parse().unwrap()));
        assert_eq!(vd.calculated_total, Money::new("92.45".parse().unwrap()));
        assert_eq!(vd.grand_total, Money::from_major(92));
        assert_eq!(vd.rounding_adjustment, Money::new("-0.45".parse().unwrap()));
        assert_eq!(vd.insurance_charges, Money::from_major(2));

        let audit = &out.lines[0].additional_discounts;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].kind, VOLUME_DISCOUNT_KIND);
        assert_eq!(audit[0].discount_id, Some(Ident::Number(77)));
    }

    #[test]
    fn test_embedded_without_rounding_setting() {
        let settings = PricingSettings {
            pf_percentage: Some(Rate::ZERO),
            ..Default::default()
        };
        let mut params = VolumeDiscountParams::new(&settings, true);
        params.insurance_charges = Money::from_major(2);
        let out = calc_embedded(&[embedded_line(false, false)], &params);
        assert_eq!(out.vd_details.grand_total, out.vd_details.calculated_total);
        assert!(out.vd_details.rounding_adjustment.is_zero());
    }

    #[test]
    fn test_embedded_blocked_unless_changed() {
        let settings = PricingSettings::default();
        let params = VolumeDiscountParams::new(&settings, true);

        let blocked = calc_embedded(&[embedded_line(true, false)], &params);
        assert!(!blocked.lines[0].volume_discount_applied);
        assert!(blocked.lines[0].additional_discounts.is_empty());

        let forced = calc_embedded(&[embedded_line(true, true)], &params);
        assert!(forced.lines[0].volume_discount_applied);
        assert_eq!(forced.lines[0].applied_discount, pct(10));
    }

    #[test]
    fn test_taxable_amount_includes_shipping_before_tax() {
        let settings = PricingSettings {
            pf_percentage: Some(Rate::ZERO),
            ..Default::default()
        };
        let mut params = VolumeDiscountParams::new(&settings, true);
        params.before_tax = true;
        let mut line = LineItem::new(1, Decimal::TWO, Money::from_major(50));
        line.shipping_charges = Money::from_major(3);
        let out = calc_tiered(&[line], &[], &params);
        assert_eq!(out.vd_details.overall_shipping, Money::from_major(6));
        assert_eq!(out.vd_details.taxable_amount, Money::from_major(106));
    }

    #[test]
    fn test_vd_details_merge() {
        let a = VdDetails {
            sub_total: Money::from_major(10),
            grand_total: Money::from_major(12),
            ..Default::default()
        };
        let b = VdDetails {
            sub_total: Money::from_major(5),
            grand_total: Money::from_major(6),
            ..Default::default()
        };
        let merged = a + b;
        assert_eq!(merged.sub_total, Money::from_major(15));
        assert_eq!(merged.grand_total, Money::from_major(18));
    }
}
