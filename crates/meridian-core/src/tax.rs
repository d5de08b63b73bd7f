//! # Tax Resolver
//!
//! Annotates each line with the tax breakup for the cart's jurisdiction.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each line                                                          │
//! │     │                                                                   │
//! │     ├── product in lookup? ── yes ──► take lookup hsnDetails            │
//! │     │                         no  ──► keep line's stored hsnDetails     │
//! │     │                                 (tax data is sticky once known)   │
//! │     ▼                                                                   │
//! │  resolve_tax_breakup(hsn, scope)                                        │
//! │     ├── Missing ─► tax 0, totals 0, empty breakup                       │
//! │     ├── Inter   ─► interTax schedule                                    │
//! │     └── Intra   ─► intraTax schedule                                    │
//! │     ▼                                                                   │
//! │  order_compound_last()  ─► exemption zeroes values, keeps names        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Compound Tax
//! A compound component is levied on the running total that already
//! includes every earlier tax, so breakups always list non-compound
//! entries first. [`stacked_tax`] is the one place that arithmetic lives;
//! the discount engine and cart totals both call it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::money::{Money, Rate};
use crate::types::{HsnDetails, LineItem, ProductTaxDetail, TaxBreakupEntry, TaxScope};

/// Which fallback level produced a breakup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakupSource {
    /// Taken from the HSN inter-state schedule.
    Inter,
    /// Taken from the HSN intra-state schedule.
    Intra,
    /// No HSN data, or no schedule for the scope: zero tax.
    Missing,
}

/// Output of [`resolve_tax_breakup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBreakup {
    pub source: BreakupSource,
    /// `hsnDetails.tax`.
    pub tax: Rate,
    /// `totalTax` of the selected schedule.
    pub total_tax: Rate,
    /// Compound entries last.
    pub entries: Vec<TaxBreakupEntry>,
}

impl ResolvedBreakup {
    fn missing(tax: Rate) -> Self {
        ResolvedBreakup {
            source: BreakupSource::Missing,
            tax,
            total_tax: Rate::ZERO,
            entries: Vec::new(),
        }
    }

    /// Zeroes every rate while keeping component names.
    pub fn exempt(mut self) -> Self {
        self.tax = Rate::ZERO;
        self.total_tax = Rate::ZERO;
        for entry in &mut self.entries {
            entry.tax_percentage = Rate::ZERO;
        }
        self
    }
}

/// Picks the schedule for `scope` and builds its ordered breakup.
///
/// ```rust
/// use meridian_core::tax::{resolve_tax_breakup, BreakupSource};
/// use meridian_core::types::TaxScope;
///
/// let resolved = resolve_tax_breakup(None, TaxScope::Inter);
/// assert_eq!(resolved.source, BreakupSource::Missing);
/// assert!(resolved.total_tax.is_zero());
/// ```
pub fn resolve_tax_breakup(hsn: Option<&HsnDetails>, scope: TaxScope) -> ResolvedBreakup {
    let Some(hsn) = hsn else {
        return ResolvedBreakup::missing(Rate::ZERO);
    };

    let Some(schedule) = hsn.schedule(scope) else {
        return ResolvedBreakup::missing(hsn.tax);
    };

    let entries = schedule
        .taxes
        .iter()
        .map(|c| TaxBreakupEntry {
            tax_name: c.tax_name.clone(),
            tax_percentage: c.rate,
            compound: c.compound,
        })
        .collect();

    ResolvedBreakup {
        source: match scope {
            TaxScope::Inter => BreakupSource::Inter,
            TaxScope::Intra => BreakupSource::Intra,
        },
        tax: hsn.tax,
        total_tax: schedule.total_tax,
        entries: order_compound_last(entries),
    }
}

/// Moves compound entries after all non-compound ones, stable in each group.
pub fn order_compound_last(entries: Vec<TaxBreakupEntry>) -> Vec<TaxBreakupEntry> {
    let (mut simple, compound): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| !e.compound);
    simple.extend(compound);
    simple
}

/// Tax on `base` for an ordered breakup.
///
/// Non-compound entries are levied on `base`; a compound entry is levied
/// on `base` plus all tax accumulated before it. Not rounded.
///
/// ```rust
/// use meridian_core::money::{Money, Rate};
/// use meridian_core::tax::stacked_tax;
/// use meridian_core::types::TaxBreakupEntry;
/// use rust_decimal::Decimal;
///
/// let entries = vec![
///     TaxBreakupEntry { tax_name: "GST".into(), tax_percentage: Rate::from_percent(Decimal::TEN), compound: false },
///     TaxBreakupEntry { tax_name: "CESS".into(), tax_percentage: Rate::from_percent(Decimal::TEN), compound: true },
/// ];
/// // 10 on 100, then 10% of 110
/// assert_eq!(stacked_tax(Money::from_major(100), &entries), Money::from_major(21));
/// ```
pub fn stacked_tax(base: Money, entries: &[TaxBreakupEntry]) -> Money {
    entries.iter().fold(Money::ZERO, |acc, entry| {
        let levy_base = if entry.compound { base + acc } else { base };
        acc + levy_base.percent(entry.tax_percentage)
    })
}

/// Effective percent of an ordered breakup (the tax on 100).
pub fn effective_rate(entries: &[TaxBreakupEntry]) -> Rate {
    Rate::from_percent(stacked_tax(Money::from_major(100), entries).amount())
}

/// Rate that applies to a line for `scope`.
///
/// Inter-state is a single consolidated rate. Intra-state stacks the
/// component breakup, falling back to the consolidated rate when the
/// catalog supplied no components.
pub fn line_rate(line: &LineItem, scope: TaxScope) -> Rate {
    match scope {
        TaxScope::Inter => line.total_inter_tax,
        TaxScope::Intra => {
            if line.intra_tax_breakup.is_empty() {
                line.total_intra_tax
            } else {
                effective_rate(&line.intra_tax_breakup)
            }
        }
    }
}

/// Tax amount on `base` for a line. Not rounded.
pub fn line_tax(line: &LineItem, scope: TaxScope, base: Money) -> Money {
    match scope {
        TaxScope::Inter => base.percent(line.total_inter_tax),
        TaxScope::Intra if !line.intra_tax_breakup.is_empty() => {
            stacked_tax(base, &line.intra_tax_breakup)
        }
        TaxScope::Intra => base.percent(line.total_intra_tax),
    }
}

/// Whether a line never received any tax metadata for `scope`.
///
/// An explicit empty schedule still counts as tax data (exempt goods).
pub fn lacks_tax_data(line: &LineItem, scope: TaxScope) -> bool {
    line.hsn_details.is_none()
        && line.product_taxes.is_empty()
        && line.breakup(scope).is_empty()
        && line.total_tax_for(scope).is_zero()
}

/// [`line_tax`], or `fallback` percent of `base` for a line without tax
/// metadata. Not rounded.
pub fn line_tax_or_fallback(
    line: &LineItem,
    scope: TaxScope,
    base: Money,
    fallback: Rate,
) -> Money {
    if lacks_tax_data(line, scope) {
        base.percent(fallback)
    } else {
        line_tax(line, scope, base)
    }
}

/// Resolves tax on every line.
///
/// - Unmatched products keep their stored `hsn_details`
/// - No line is ever dropped and nothing fails
/// - `is_tax_exempt` zeroes values but keeps the breakup shape
///
/// ```rust
/// use meridian_core::tax::resolve_tax;
/// use meridian_core::types::LineItem;
/// use meridian_core::money::Money;
/// use rust_decimal::Decimal;
///
/// let lines = vec![LineItem::new(1, Decimal::ONE, Money::from_major(10))];
/// let resolved = resolve_tax(&lines, &[], true, false);
/// assert_eq!(resolved.len(), 1);
/// assert!(resolved[0].tax.is_zero());
/// ```
pub fn resolve_tax(
    existing_lines: &[LineItem],
    product_tax_details: &[ProductTaxDetail],
    is_inter: bool,
    is_tax_exempt: bool,
) -> Vec<LineItem> {
    let scope = TaxScope::from_is_inter(is_inter);
    let lookup: HashMap<String, &ProductTaxDetail> = product_tax_details
        .iter()
        .map(|d| (d.product_id.key(), d))
        .collect();

    existing_lines
        .iter()
        .map(|line| {
            let mut line = line.clone();

            match lookup.get(&line.product_id.key()) {
                Some(detail) => line.hsn_details = detail.hsn_details.clone(),
                None => debug!(
                    product_id = %line.product_id,
                    "No tax lookup entry, keeping stored HSN details"
                ),
            }

            let mut resolved = resolve_tax_breakup(line.hsn_details.as_ref(), scope);
            if is_tax_exempt {
                resolved = resolved.exempt();
            }
            apply_breakup(&mut line, scope, resolved);
            line
        })
        .collect()
}

fn apply_breakup(line: &mut LineItem, scope: TaxScope, resolved: ResolvedBreakup) {
    line.tax = resolved.tax;
    line.total_inter_tax = Rate::ZERO;
    line.total_intra_tax = Rate::ZERO;
    line.inter_tax_breakup.clear();
    line.intra_tax_breakup.clear();

    match scope {
        TaxScope::Inter => {
            line.total_inter_tax = resolved.total_tax;
            line.inter_tax_breakup = resolved.entries.clone();
        }
        TaxScope::Intra => {
            line.total_intra_tax = resolved.total_tax;
            line.intra_tax_breakup = resolved.entries.clone();
        }
    }
    line.product_taxes = resolved.entries;
}

// =============================================================================
// Unit Tests
// =============================================================================
