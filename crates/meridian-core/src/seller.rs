//! # Seller Cart Aggregation
//!
//! Splits a multi-seller cart into seller groups, prices each group and
//! rolls the groups up into one cart summary.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lines ──► group() ──► { seller key ──► SellerGroup }                   │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                        price_all()                                      │
//! │                        ├── cart_totals()            always              │
//! │                        ├── calc_tiered()            tiers for seller    │
//! │                        └── calc_embedded()          embedded VD objects │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                      overall_summary() ──► PricingResult                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Seller Key Fallback
//! ```text
//! sellerId ──► vendorId ──► partnerId ──► "no-seller"
//! ```
//!
//! ## Pricing Source Fallback
//! ```text
//! table[sellerId or vendorId] ──► table["no-seller-id"] ──► None + report
//! ```
//!
//! Groups live in a `BTreeMap` so every run over the same cart yields the
//! same order.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::cart::{cart_totals, CartCharges, PricingResult};
use crate::config::PricingSettings;
use crate::discount::{calc_embedded, calc_tiered, VdDetails, VolumeDiscountParams};
use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Rate};
use crate::types::{Ident, LineItem, TaxScope, VolumeDiscountTier, VOLUME_DISCOUNT_KIND};
use crate::{LOCATION_NOT_SPECIFIED, NO_SELLER_KEY, NO_SELLER_PRICING_KEY, UNKNOWN_SELLER};

// =============================================================================
// Seller Resolution
// =============================================================================

/// Which id produced the seller key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SellerKeySource {
    Seller,
    Vendor,
    Partner,
    NoSeller,
}

/// A seller key together with the fallback level that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSeller {
    pub key: String,
    pub source: SellerKeySource,
}

fn present(id: &Option<Ident>) -> Option<&Ident> {
    id.as_ref().filter(|id| !id.is_blank())
}

/// Resolves the grouping key for a line.
///
/// ```rust
/// use meridian_core::seller::{resolve_seller_id, SellerKeySource};
/// use meridian_core::types::LineItem;
/// use meridian_core::money::Money;
/// use rust_decimal::Decimal;
///
/// let mut line = LineItem::new(1, Decimal::ONE, Money::ZERO);
/// line.vendor_id = Some("v-7".into());
/// let resolved = resolve_seller_id(&line);
/// assert_eq!(resolved.key, "v-7");
/// assert_eq!(resolved.source, SellerKeySource::Vendor);
/// ```
pub fn resolve_seller_id(line: &LineItem) -> ResolvedSeller {
    let candidates = [
        (present(&line.seller_id), SellerKeySource::Seller),
        (present(&line.vendor_id), SellerKeySource::Vendor),
        (present(&line.partner_id), SellerKeySource::Partner),
    ];

    candidates
        .into_iter()
        .find_map(|(id, source)| {
            id.map(|id| ResolvedSeller {
                key: id.key(),
                source,
            })
        })
        .unwrap_or_else(|| ResolvedSeller {
            key: NO_SELLER_KEY.to_string(),
            source: SellerKeySource::NoSeller,
        })
}

// =============================================================================
// Grouping
// =============================================================================

/// Display metadata for a seller, taken from its first line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellerInfo {
    pub seller_id: String,
    pub source: SellerKeySource,
    pub name: String,
    pub location: String,
}

impl SellerInfo {
    fn from_line(resolved: ResolvedSeller, line: &LineItem) -> Self {
        let name = non_empty(&line.seller_name)
            .or_else(|| non_empty(&line.vendor_name))
            .unwrap_or(UNKNOWN_SELLER);
        let location = non_empty(&line.seller_location)
            .or_else(|| non_empty(&line.vendor_location))
            .unwrap_or(LOCATION_NOT_SPECIFIED);

        SellerInfo {
            seller_id: resolved.key,
            source: resolved.source,
            name: name.to_string(),
            location: location.to_string(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Lines belonging to one seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellerGroup {
    pub seller: SellerInfo,
    pub items: Vec<LineItem>,
    pub item_count: u32,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[ts(type = "number")]
    pub total_quantity: Decimal,
}

/// Groups lines by seller key.
///
/// Every line lands in exactly one group.
pub fn group(lines: &[LineItem]) -> BTreeMap<String, SellerGroup> {
    let mut groups: BTreeMap<String, SellerGroup> = BTreeMap::new();

    for line in lines {
        let resolved = resolve_seller_id(line);
        let entry = groups.entry(resolved.key.clone()).or_insert_with(|| SellerGroup {
            seller: SellerInfo::from_line(resolved, line),
            items: Vec::new(),
            item_count: 0,
            total_quantity: Decimal::ZERO,
        });
        entry.items.push(line.clone());
        entry.item_count += 1;
        entry.total_quantity = entry.total_quantity.saturating_add(line.quantity);
    }

    debug!(lines = lines.len(), groups = groups.len(), "Cart grouped by seller");
    groups
}

// =============================================================================
// Per-Seller Pricing
// =============================================================================

/// Inputs shared by every seller group.
#[derive(Debug, Clone, Copy)]
pub struct SellerPricingParams<'a> {
    pub is_inter: bool,
    pub settings: &'a PricingSettings,
    /// Tier lists from the discount service, keyed by seller key.
    pub tiers: &'a BTreeMap<String, Vec<VolumeDiscountTier>>,
    /// Out-of-line charges, keyed by seller key.
    pub charges: &'a BTreeMap<String, CartCharges>,
    pub before_tax: bool,
    /// Rate for lines that never received HSN data.
    pub tax_rate_percent: Rate,
}

/// Plain cart totals plus the volume-discount view when it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellerPricing {
    pub cart: PricingResult,
    pub vd: Option<VdDetails>,
}

impl SellerPricing {
    pub fn vd_applied(&self) -> bool {
        self.vd.is_some()
    }

    /// Totals to show for this group: VD figures when VD ran.
    pub fn effective(&self) -> PricingResult {
        let Some(vd) = self.vd else {
            return self.cart;
        };
        let grand_total = vd.grand_total;
        let due = grand_total - self.cart.already_paid;
        PricingResult {
            total_tax: vd.overall_tax,
            total_shipping: vd.overall_shipping,
            pf_rate: vd.pf_rate,
            insurance_charges: vd.insurance_charges,
            taxable_amount: vd.taxable_amount,
            calculated_total: vd.calculated_total,
            grand_total,
            rounding_adjustment: vd.rounding_adjustment,
            amount_due: if due.is_negative() { Money::ZERO } else { due },
            ..self.cart
        }
    }

    /// This group's contribution to a cart-wide VD view.
    pub fn vd_view(&self) -> VdDetails {
        self.vd.unwrap_or_else(|| VdDetails::from_cart(&self.cart))
    }
}

/// A priced seller group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricedSellerGroup {
    pub seller: SellerInfo,
    pub items: Vec<LineItem>,
    pub pricing: SellerPricing,
}

/// Prices every group.
///
/// Mode A runs when the discount service supplied tiers for the seller;
/// otherwise Mode B runs when any line embeds a discount object. Empty
/// input gives an empty map.
pub fn price_all(
    groups: &BTreeMap<String, SellerGroup>,
    params: &SellerPricingParams<'_>,
) -> BTreeMap<String, PricedSellerGroup> {
    groups
        .iter()
        .map(|(key, group)| (key.clone(), price_group(key, group, params)))
        .collect()
}

fn price_group(key: &str, group: &SellerGroup, params: &SellerPricingParams<'_>) -> PricedSellerGroup {
    let scope = TaxScope::from_is_inter(params.is_inter);
    let charges = params.charges.get(key).copied().unwrap_or_default();
    let cart = cart_totals(
        &group.items,
        scope,
        params.settings,
        &charges,
        params.tax_rate_percent,
    );

    let vd_params = VolumeDiscountParams {
        is_inter: params.is_inter,
        sub_total: cart.total_value,
        pf_rate_base: cart.pf_rate,
        insurance_charges: charges.insurance,
        settings: params.settings,
        before_tax: params.before_tax,
        tax_rate_percent: params.tax_rate_percent,
        precision: params.settings.precision,
    };

    let tiers = params.tiers.get(key).filter(|t| !t.is_empty());
    let outcome = if let Some(tiers) = tiers {
        Some(calc_tiered(&group.items, tiers, &vd_params))
    } else if group.items.iter().any(|l| l.volume_discount_obj.is_some()) {
        Some(calc_embedded(&group.items, &vd_params))
    } else {
        None
    };

    let (items, vd) = match outcome {
        Some(outcome) => (outcome.lines, Some(outcome.vd_details)),
        None => (with_line_totals(&group.items, params.settings.precision), None),
    };

    debug!(seller = key, vd_applied = vd.is_some(), "Seller group priced");

    PricedSellerGroup {
        seller: group.seller.clone(),
        items,
        pricing: SellerPricing { cart, vd },
    }
}

/// Lines of a group priced without volume discount.
///
/// `total_price` is refreshed; a volume discount left over from an
/// earlier run is cleared.
fn with_line_totals(items: &[LineItem], precision: u32) -> Vec<LineItem> {
    items
        .iter()
        .map(|line| {
            let mut line = line.clone();
            if line.volume_discount_applied {
                line.unit_price = line.pre_volume_unit_price();
                line.volume_discount_applied = false;
                line.applied_discount = Rate::ZERO;
                line.additional_discounts.retain(|d| d.kind != VOLUME_DISCOUNT_KIND);
            }
            line.total_price = line.unit_price.times(line.quantity).round_dp(precision);
            line
        })
        .collect()
}

/// Sums every group's effective totals. Empty input is all-zero.
pub fn overall_summary(priced: &BTreeMap<String, PricedSellerGroup>) -> PricingResult {
    priced
        .values()
        .map(|g| g.pricing.effective())
        .fold(PricingResult::default(), |acc, p| acc + p)
}

/// Cart-wide VD view, or `None` when no group ran volume discount.
pub fn overall_vd(priced: &BTreeMap<String, PricedSellerGroup>) -> Option<VdDetails> {
    if !priced.values().any(|g| g.pricing.vd_applied()) {
        return None;
    }
    Some(
        priced
            .values()
            .map(|g| g.pricing.vd_view())
            .fold(VdDetails::default(), |acc, vd| acc + vd),
    )
}

// =============================================================================
// Pricing Source Resolution
// =============================================================================

/// One row of the special-pricing table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct PricingEntry {
    #[serde(alias = "ProductId")]
    pub product_id: Ident,
    #[serde(rename = "MasterPrice", alias = "masterPrice")]
    pub master_price: Option<Money>,
    #[serde(rename = "BasePrice", alias = "basePrice")]
    pub base_price: Option<Money>,
    pub price_not_available: bool,
}

impl PricingEntry {
    /// Usable price, if the entry is valid.
    pub fn price(&self) -> Option<Money> {
        if self.price_not_available {
            return None;
        }
        self.master_price.or(self.base_price)
    }
}

/// Seller key → pricing rows.
pub type PricingTable = BTreeMap<String, Vec<PricingEntry>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum PricingSource {
    SellerSpecific,
    NoSellerId,
}

/// A resolved price and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricingMatch {
    pub price: Money,
    pub source: PricingSource,
    pub matched_seller_id: String,
}

/// Why a product has no usable price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MissingPricingReason {
    /// No row for the product under either key.
    NoEntry,
    /// A row exists but is flagged `priceNotAvailable`.
    PriceNotAvailable,
    /// A row exists with neither master nor base price.
    NoPrice,
}

fn pricing_key(line: &LineItem) -> Option<String> {
    present(&line.seller_id)
        .or_else(|| present(&line.vendor_id))
        .map(Ident::key)
}

fn lookup(
    line: &LineItem,
    table: &PricingTable,
    key: &str,
    source: PricingSource,
) -> Result<PricingMatch, MissingPricingReason> {
    let entry = table
        .get(key)
        .and_then(|rows| rows.iter().find(|row| row.product_id.same_as(&line.product_id)))
        .ok_or(MissingPricingReason::NoEntry)?;

    match entry.price() {
        Some(price) => Ok(PricingMatch {
            price,
            source,
            matched_seller_id: key.to_string(),
        }),
        None if entry.price_not_available => Err(MissingPricingReason::PriceNotAvailable),
        None => Err(MissingPricingReason::NoPrice),
    }
}

fn resolve_with_reason(line: &LineItem, table: &PricingTable) -> Result<PricingMatch, MissingPricingReason> {
    let seller_level = match pricing_key(line) {
        Some(key) => lookup(line, table, &key, PricingSource::SellerSpecific),
        None => Err(MissingPricingReason::NoEntry),
    };

    seller_level.or_else(|seller_reason| {
        lookup(line, table, NO_SELLER_PRICING_KEY, PricingSource::NoSellerId).map_err(|fallback_reason| {
            // Report the more specific reason when the seller row existed.
            if fallback_reason == MissingPricingReason::NoEntry {
                seller_reason
            } else {
                fallback_reason
            }
        })
    })
}

/// Resolves the price for a line through the source fallback chain.
pub fn resolve_pricing(line: &LineItem, table: &PricingTable) -> Option<PricingMatch> {
    resolve_with_reason(line, table).ok()
}

/// A product that order placement must block on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MissingPricing {
    pub product_id: Ident,
    pub seller_key: Option<String>,
    pub reason: MissingPricingReason,
}

/// Pricing resolution for a whole cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricingReport {
    /// Product key → match.
    pub resolved: BTreeMap<String, PricingMatch>,
    pub products_without_pricing: Vec<MissingPricing>,
}

impl PricingReport {
    /// Fails when any product lacks a usable price.
    pub fn ensure_orderable(&self) -> CoreResult<()> {
        if self.products_without_pricing.is_empty() {
            return Ok(());
        }
        Err(CoreError::PricingUnavailable {
            products: self
                .products_without_pricing
                .iter()
                .map(|m| m.product_id.key())
                .collect(),
        })
    }
}

/// Resolves every line and reports the ones without a usable price.
pub fn resolve_all_pricing(lines: &[LineItem], table: &PricingTable) -> PricingReport {
    let mut report = PricingReport::default();

    for line in lines {
        match resolve_with_reason(line, table) {
            Ok(found) => {
                report.resolved.insert(line.product_id.key(), found);
            }
            Err(reason) => {
                warn!(product_id = %line.product_id, ?reason, "No usable price for product");
                report.products_without_pricing.push(MissingPricing {
                    product_id: line.product_id.clone(),
                    seller_key: pricing_key(line),
                    reason,
                });
            }
        }
    }

    report
}

// =============================================================================
// Unit Tests
// =============================================================================
