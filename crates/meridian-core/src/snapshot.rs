//! # Snapshot Recompute
//!
//! The single entry point a caller's state loop uses. Every edit produces a
//! new immutable [`QuoteSnapshot`]; [`recompute`] prices it from scratch and
//! the caller replaces whatever result it held.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  QuoteSnapshot                                                          │
//! │      │                                                                  │
//! │      ├── resolve_tax(lines)  ───────────┐                               │
//! │      ├── resolve_tax(removed lines) ─┐  │                               │
//! │      │                               │  ▼                               │
//! │      │                               │  group() ──► price_all()         │
//! │      │                               │                 │                │
//! │      │                               │                 ├► overall_summary│
//! │      │                               │                 └► overall_vd    │
//! │      ├── resolve_all_pricing(lines) ─┼──────────────────────┐           │
//! │      ▼                               ▼                      ▼           │
//! │  Recomputation { lines, removed_lines, sellers, summary, vd, report }   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no incremental update and no shared state: the same snapshot
//! always yields the same recomputation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use ts_rs::TS;

use crate::cart::{CartCharges, PricingResult};
use crate::config::PricingSettings;
use crate::discount::VdDetails;
use crate::error::CoreResult;
use crate::ingress::normalize_lines;
use crate::money::Rate;
use crate::quotation::{PricingSnapshot, QuoteFormValues, QuoteOverview};
use crate::seller::{
    group, overall_summary, overall_vd, price_all, resolve_all_pricing, resolve_seller_id,
    PricedSellerGroup, PricingReport, PricingTable, SellerPricingParams,
};
use crate::tax::resolve_tax;
use crate::types::{LineItem, ProductTaxDetail, VolumeDiscountTier};

/// Everything needed to price a quote, frozen at one point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct QuoteSnapshot {
    pub lines: Vec<LineItem>,
    /// Deleted lines, kept so the server can reconcile them.
    pub removed_lines: Vec<LineItem>,
    pub product_tax_details: Vec<ProductTaxDetail>,
    pub is_inter: bool,
    pub tax_exemption: bool,
    /// Tier lists from the discount service, keyed by seller key.
    pub volume_discount_tiers: BTreeMap<String, Vec<VolumeDiscountTier>>,
    /// Out-of-line charges, keyed by seller key.
    pub charges: BTreeMap<String, CartCharges>,
    pub pricing_table: PricingTable,
    /// Shipping is charged before tax.
    pub before_tax: bool,
    /// Rate for lines that never received HSN data.
    pub tax_rate_percent: Rate,
    pub settings: PricingSettings,

    /// Quote context passed through to the payload.
    pub overview: QuoteOverview,
    pub form: QuoteFormValues,
    pub previous: Option<QuoteFormValues>,
}

/// Wire shape of a snapshot: lines stay raw until ingress has seen them.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    #[serde(default)]
    lines: Vec<Value>,
    #[serde(default)]
    removed_lines: Vec<Value>,
    #[serde(flatten)]
    rest: QuoteSnapshot,
}

impl QuoteSnapshot {
    /// Parses a snapshot document, normalizing every line through
    /// [`crate::ingress`].
    ///
    /// Only a document that is not a JSON object of the expected shape
    /// fails; malformed lines degrade.
    pub fn from_json_str(text: &str) -> CoreResult<Self> {
        let raw: RawSnapshot = serde_json::from_str(text)?;
        Ok(QuoteSnapshot {
            lines: normalize_lines(&raw.lines),
            removed_lines: normalize_lines(&raw.removed_lines),
            ..raw.rest
        })
    }
}

/// Result of pricing one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Recomputation {
    /// Priced active lines, in cart order.
    pub lines: Vec<LineItem>,
    /// Tax-resolved removed lines.
    pub removed_lines: Vec<LineItem>,
    pub sellers: BTreeMap<String, PricedSellerGroup>,
    pub summary: PricingResult,
    pub vd_summary: Option<VdDetails>,
    #[serde(rename = "VDapplied")]
    pub vd_applied: bool,
    pub pricing_report: PricingReport,
}

impl Recomputation {
    /// Pricing block for the quote form.
    pub fn pricing_snapshot(&self) -> PricingSnapshot {
        PricingSnapshot {
            cart: self.summary,
            vd_details: self.vd_summary,
            vd_applied: self.vd_applied,
        }
    }

    /// `base` with the recomputed lines and pricing written in.
    pub fn form_values(&self, base: &QuoteFormValues, snapshot: &QuoteSnapshot) -> QuoteFormValues {
        QuoteFormValues {
            lines: Some(self.lines.clone()),
            removed_lines: Some(self.removed_lines.clone()),
            is_inter: Some(snapshot.is_inter),
            tax_exemption: Some(snapshot.tax_exemption),
            pricing: Some(self.pricing_snapshot()),
            ..base.clone()
        }
    }
}

/// Restores input order after grouping reordered lines by seller.
fn in_cart_order(
    original: &[LineItem],
    sellers: &BTreeMap<String, PricedSellerGroup>,
) -> Vec<LineItem> {
    let mut queues: HashMap<&str, std::slice::Iter<'_, LineItem>> = sellers
        .iter()
        .map(|(key, g)| (key.as_str(), g.items.iter()))
        .collect();

    original
        .iter()
        .filter_map(|line| {
            let key = resolve_seller_id(line).key;
            queues.get_mut(key.as_str()).and_then(Iterator::next).cloned()
        })
        .collect()
}

/// Prices a snapshot from scratch.
///
/// ```rust
/// use meridian_core::snapshot::{recompute, QuoteSnapshot};
///
/// let result = recompute(&QuoteSnapshot::default());
/// assert!(result.sellers.is_empty());
/// assert_eq!(result.summary, Default::default());
/// assert!(!result.vd_applied);
/// ```
pub fn recompute(snapshot: &QuoteSnapshot) -> Recomputation {
    let exempt = snapshot.tax_exemption;
    let lines = resolve_tax(&snapshot.lines, &snapshot.product_tax_details, snapshot.is_inter, exempt);
    let removed_lines = resolve_tax(
        &snapshot.removed_lines,
        &snapshot.product_tax_details,
        snapshot.is_inter,
        exempt,
    );

    let params = SellerPricingParams {
        is_inter: snapshot.is_inter,
        settings: &snapshot.settings,
        tiers: &snapshot.volume_discount_tiers,
        charges: &snapshot.charges,
        before_tax: snapshot.before_tax,
        tax_rate_percent: if exempt { Rate::ZERO } else { snapshot.tax_rate_percent },
    };

    let sellers = price_all(&group(&lines), &params);
    let summary = overall_summary(&sellers);
    let vd_summary = overall_vd(&sellers);
    let pricing_report = resolve_all_pricing(&lines, &snapshot.pricing_table);
    let priced_lines = in_cart_order(&lines, &sellers);

    info!(
        lines = priced_lines.len(),
        sellers = sellers.len(),
        vd_applied = vd_summary.is_some(),
        missing_prices = pricing_report.products_without_pricing.len(),
        grand_total = %summary.grand_total,
        "Quote recomputed"
    );

    Recomputation {
        lines: priced_lines,
        removed_lines,
        sellers,
        summary,
        vd_applied: vd_summary.is_some(),
        vd_summary,
        pricing_report,
    }
}
