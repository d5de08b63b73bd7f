//! Discount-resolution strategies.
//!
//! The two volume-discount modes share all arithmetic and differ only in
//! how a line's percentage is found:
//!
//! ```text
//! TierLookupStrategy       tier list from the discount service,
//!                          matched by item number, then product id
//!
//! EmbeddedObjectStrategy   volume_discount_obj on the line itself,
//!                          subject to combinability
//! ```

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::money::Rate;
use crate::types::{Ident, LineItem, VolumeDiscountTier};

/// Why a line got the percentage it got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountSource {
    /// Nothing matched.
    None,
    /// Matched an external tier.
    Tier,
    /// Embedded object that may combine with other discounts.
    Embedded,
    /// Embedded object that cannot combine, applied because the user
    /// changed it explicitly.
    Forced,
    /// Embedded object skipped because it cannot combine.
    Blocked,
}

/// Percentage chosen for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountResolution {
    pub percent: Rate,
    pub source: DiscountSource,
    pub discount_id: Option<Ident>,
}

impl DiscountResolution {
    pub fn none() -> Self {
        DiscountResolution {
            percent: Rate::ZERO,
            source: DiscountSource::None,
            discount_id: None,
        }
    }

    fn of(percent: Rate, source: DiscountSource, discount_id: Option<Ident>) -> Self {
        DiscountResolution {
            percent: clamp_percent(percent),
            source,
            discount_id,
        }
    }

    /// A strictly positive percentage was resolved.
    pub fn is_applied(&self) -> bool {
        self.percent.is_positive()
    }
}

fn clamp_percent(percent: Rate) -> Rate {
    let value = percent.percent();
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        warn!(%percent, "Discount percentage out of range, clamping");
        return Rate::from_percent(value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED));
    }
    percent
}

/// Finds the discount percentage for a line.
pub trait DiscountStrategy {
    fn resolve(&self, line: &LineItem) -> DiscountResolution;

    /// Back out embedded tax from tax-inclusive list prices first.
    fn backs_out_inclusive_tax(&self) -> bool {
        false
    }

    /// Write a `volume` entry into the line's `additional_discounts`.
    fn records_audit_entry(&self) -> bool {
        false
    }
}

// =============================================================================
// Tier Lookup
// =============================================================================

/// Resolves percentages from an externally supplied tier list.
#[derive(Debug, Default)]
pub struct TierLookupStrategy<'a> {
    by_item_no: HashMap<i64, &'a VolumeDiscountTier>,
    by_product: HashMap<String, &'a VolumeDiscountTier>,
}

impl<'a> TierLookupStrategy<'a> {
    /// Indexes tiers. On duplicate keys the first tier wins.
    pub fn new(tiers: &'a [VolumeDiscountTier]) -> Self {
        let mut strategy = TierLookupStrategy::default();
        for tier in tiers {
            if let Some(item_no) = tier.item_no {
                strategy.by_item_no.entry(item_no).or_insert(tier);
            }
            if let Some(product_id) = &tier.product_id {
                strategy.by_product.entry(product_id.key()).or_insert(tier);
            }
        }
        strategy
    }

    fn find(&self, line: &LineItem) -> Option<&'a VolumeDiscountTier> {
        line.item_no
            .and_then(|n| self.by_item_no.get(&n).copied())
            .or_else(|| self.by_product.get(&line.product_id.key()).copied())
    }
}

impl DiscountStrategy for TierLookupStrategy<'_> {
    fn resolve(&self, line: &LineItem) -> DiscountResolution {
        match self.find(line) {
            Some(tier) => DiscountResolution::of(tier.applied_discount, DiscountSource::Tier, None),
            None => DiscountResolution::none(),
        }
    }
}

// =============================================================================
// Embedded Object
// =============================================================================

/// Resolves percentages from each line's `volume_discount_obj`.
///
/// ## Combinability
/// ```text
/// obj present? ── no ──────────────────────────────► 0 (None)
///      │
///      ├── cannot_combine == false ────────────────► obj % (Embedded)
///      ├── cannot_combine && disc_changed ─────────► obj % (Forced)
///      └── cannot_combine && !disc_changed ────────► 0 (Blocked)
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedObjectStrategy;

impl DiscountStrategy for EmbeddedObjectStrategy {
    fn resolve(&self, line: &LineItem) -> DiscountResolution {
        let Some(obj) = &line.volume_discount_obj else {
            return DiscountResolution::none();
        };

        let id = obj.discount_id.clone();
        if !obj.cannot_combine_with_other_discounts {
            DiscountResolution::of(obj.percentage, DiscountSource::Embedded, id)
        } else if obj.disc_changed {
            DiscountResolution::of(obj.percentage, DiscountSource::Forced, id)
        } else {
            DiscountResolution {
                percent: Rate::ZERO,
                source: DiscountSource::Blocked,
                discount_id: id,
            }
        }
    }

    fn backs_out_inclusive_tax(&self) -> bool {
        true
    }

    fn records_audit_entry(&self) -> bool {
        true
    }
}
