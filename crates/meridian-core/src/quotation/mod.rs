//! # Quotation Payload Assembly
//!
//! Merges the priced cart with the quote form, the quote overview and the
//! previously saved quote into the body handed to the order/quote API.
//!
//! ## Field Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Three-Level Fallback (per section)                      │
//! │                                                                         │
//! │   current form ──► previously saved quote ──► structural default       │
//! │                                                                         │
//! │   Only edited sections appear in the form, so a partial edit (say,     │
//! │   line items only) keeps the saved addresses and terms untouched.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! Totals are taken from [`select_totals`] and nowhere else.
//!
//! ## Errors
//! Only a missing line-item container in both the form and the saved quote
//! is an error ([`CoreError::MissingLineItems`]). An empty list is fine.

mod payload;

pub use payload::*;

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::cart::PricingResult;
use crate::discount::VdDetails;
use crate::error::{CoreError, CoreResult};
use crate::types::{LineItem, Reference, TaxScope};

// =============================================================================
// Inputs
// =============================================================================

/// A postal address block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Address {
    pub id: Option<i64>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

/// Pricing state carried by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct PricingSnapshot {
    pub cart: PricingResult,
    pub vd_details: Option<VdDetails>,
    #[serde(rename = "VDapplied", alias = "vdApplied")]
    pub vd_applied: bool,
}

/// Quote form state. Every section is optional: `None` means "not
/// touched in this edit".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct QuoteFormValues {
    /// The line-item container.
    pub lines: Option<Vec<LineItem>>,
    pub removed_lines: Option<Vec<LineItem>>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    pub terms: Option<String>,
    pub additional_terms: Option<String>,
    pub comment: Option<String>,
    pub quote_users: Option<Vec<Reference>>,
    pub deletable_quote_users: Option<Vec<i64>>,
    pub tags_list: Option<Vec<Reference>>,
    pub deletable_tags: Option<Vec<i64>>,
    pub is_inter: Option<bool>,
    pub tax_exemption: Option<bool>,
    pub pricing: Option<PricingSnapshot>,
}

/// Identity and party metadata from the quote overview.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct QuoteOverview {
    pub quotation_id: Option<i64>,
    /// Saved version; the payload carries it unchanged. Missing means 1.
    pub version: Option<i64>,
    pub reference_number: Option<String>,
    pub quote_name: Option<String>,
    pub buyer_company_id: Option<i64>,
    pub buyer_branch_id: Option<i64>,
    pub seller_company_id: Option<i64>,
    pub seller_branch_id: Option<i64>,
    pub currency_id: Option<i64>,
    #[ts(as = "Option<String>")]
    pub valid_till: Option<chrono::NaiveDate>,
}

// =============================================================================
// Assembly
// =============================================================================

/// Form value, else the saved value.
fn pick<'a, T>(
    form: &'a QuoteFormValues,
    previous: Option<&'a QuoteFormValues>,
    field: impl Fn(&'a QuoteFormValues) -> &'a Option<T>,
) -> Option<&'a T> {
    field(form)
        .as_ref()
        .or_else(|| previous.and_then(|p| field(p).as_ref()))
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn ids(references: Option<&Vec<Reference>>) -> Vec<i64> {
    references
        .map(|refs| refs.iter().map(|r| r.id).collect())
        .unwrap_or_default()
}

/// Builds the submission payload.
///
/// Pure: the same inputs always serialize to the same bytes.
///
/// ```rust
/// use meridian_core::quotation::{assemble, QuoteFormValues, QuoteOverview};
///
/// let form = QuoteFormValues { lines: Some(vec![]), comment: Some("   ".into()), ..Default::default() };
/// let payload = assemble(&form, &QuoteOverview::default(), None).unwrap();
/// assert!(payload.comment.is_none());
/// assert!(payload.quotation_details.is_empty());
///
/// assert!(assemble(&QuoteFormValues::default(), &QuoteOverview::default(), None).is_err());
/// ```
pub fn assemble(
    form: &QuoteFormValues,
    overview: &QuoteOverview,
    previous: Option<&QuoteFormValues>,
) -> CoreResult<QuotationPayload> {
    let lines = pick(form, previous, |v| &v.lines).ok_or(CoreError::MissingLineItems)?;
    let removed = pick(form, previous, |v| &v.removed_lines);

    let is_inter = pick(form, previous, |v| &v.is_inter).copied().unwrap_or(false);
    let tax_exemption = pick(form, previous, |v| &v.tax_exemption)
        .copied()
        .unwrap_or(false);
    let pricing = pick(form, previous, |v| &v.pricing).copied().unwrap_or_default();
    let scope = TaxScope::from_is_inter(is_inter);

    let map_lines = |lines: &[LineItem]| -> Vec<PayloadLine> {
        lines.iter().map(|l| PayloadLine::from_line(l, scope)).collect()
    };

    let payload = QuotationPayload {
        quotation_id: overview.quotation_id,
        version: overview.version.unwrap_or(1),
        reference_number: trimmed(overview.reference_number.as_ref()),
        quote_name: trimmed(overview.quote_name.as_ref()),
        buyer_company_id: overview.buyer_company_id,
        buyer_branch_id: overview.buyer_branch_id,
        seller_company_id: overview.seller_company_id,
        seller_branch_id: overview.seller_branch_id,
        currency_id: overview.currency_id,
        valid_till: overview.valid_till,

        billing_address: pick(form, previous, |v| &v.billing_address).cloned(),
        shipping_address: pick(form, previous, |v| &v.shipping_address).cloned(),
        terms: pick(form, previous, |v| &v.terms).cloned(),
        additional_terms: pick(form, previous, |v| &v.additional_terms)
            .map(|s| s.trim().to_string()),
        comment: trimmed(pick(form, previous, |v| &v.comment)),

        quote_users: ids(pick(form, previous, |v| &v.quote_users)),
        deletable_quote_users: form.deletable_quote_users.clone().unwrap_or_default(),
        tags: ids(pick(form, previous, |v| &v.tags_list)),
        deletable_tags: form.deletable_tags.clone().unwrap_or_default(),

        is_inter,
        tax_exemption,
        vd_applied: pricing.vd_applied,
        totals: select_totals(pricing.vd_applied, &pricing.cart, pricing.vd_details.as_ref()),

        quotation_details: map_lines(lines.as_slice()),
        removed_quotation_details: removed.map(|r| map_lines(r.as_slice())).unwrap_or_default(),
    };

    debug!(
        lines = payload.quotation_details.len(),
        removed = payload.removed_quotation_details.len(),
        vd_applied = payload.vd_applied,
        grand_total = %payload.totals.grand_total,
        "Quotation payload assembled"
    );

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use rust_decimal::Decimal;

    fn saved() -> QuoteFormValues {
        QuoteFormValues {
            lines: Some(vec![LineItem::new(1, Decimal::ONE, Money::from_major(10))]),
            billing_address: Some(Address {
                id: Some(44),
                city: Some("Pune".into()),
                ..Default::default()
            }),
            terms: Some("Net 30".into()),
            quote_users: Some(vec![Reference::new(5, "Asha"), Reference::new(6, "Ravi")]),
            deletable_quote_users: Some(vec![99]),
            is_inter: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn test_partial_edit_keeps_saved_sections() {
        let form = QuoteFormValues {
            lines: Some(vec![
                LineItem::new(1, Decimal::ONE, Money::from_major(10)),
                LineItem::new(2, Decimal::ONE, Money::from_major(20)),
            ]),
            ..Default::default()
        };
        let previous = saved();
        let payload = assemble(&form, &QuoteOverview::default(), Some(&previous)).unwrap();

        assert_eq!(payload.quotation_details.len(), 2);
        assert_eq!(payload.billing_address.and_then(|a| a.id), Some(44));
        assert_eq!(payload.terms.as_deref(), Some("Net 30"));
        assert_eq!(payload.quote_users, vec![5, 6]);
        assert!(payload.is_inter);
        // deletable lists are never inherited
        assert!(payload.deletable_quote_users.is_empty());
    }

    #[test]
    fn test_lines_fall_back_to_saved_container() {
        let payload = assemble(&QuoteFormValues::default(), &QuoteOverview::default(), Some(&saved())).unwrap();
        assert_eq!(payload.quotation_details.len(), 1);
    }

    #[test]
    fn test_missing_container_is_error() {
        let err = assemble(&QuoteFormValues::default(), &QuoteOverview::default(), None).unwrap_err();
        assert!(matches!(err, CoreError::MissingLineItems));
    }

    #[test]
    fn test_text_normalization() {
        let form = QuoteFormValues {
            lines: Some(vec![]),
            comment: Some("  call before delivery \n".into()),
            additional_terms: Some("  FOB  ".into()),
            ..Default::default()
        };
        let payload = assemble(&form, &QuoteOverview::default(), None).unwrap();
        assert_eq!(payload.comment.as_deref(), Some("call before delivery"));
        assert_eq!(payload.additional_terms.as_deref(), Some("FOB"));

        let blank = QuoteFormValues {
            comment: Some(" \t ".into()),
            ..form
        };
        let payload = assemble(&blank, &QuoteOverview::default(), None).unwrap();
        assert!(payload.comment.is_none());
        assert!(serde_json::to_value(&payload).unwrap()["comment"].is_null());
    }

    #[test]
    fn test_grand_total_follows_vd_flag() {
        let pricing = PricingSnapshot {
            cart: PricingResult {
                grand_total: Money::from_major(118),
                ..Default::default()
            },
            vd_details: Some(VdDetails {
                grand_total: Money::from_major(106),
                ..Default::default()
            }),
            vd_applied: true,
        };
        let form = QuoteFormValues {
            lines: Some(vec![]),
            pricing: Some(pricing),
            ..Default::default()
        };
        let payload = assemble(&form, &QuoteOverview::default(), None).unwrap();
        assert!(payload.vd_applied);
        assert_eq!(payload.totals.grand_total, Money::from_major(106));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["VDapplied"], true);
        assert_eq!(json["grandTotal"], 106.0);
    }

    #[test]
    fn test_overview_identity() {
        let overview = QuoteOverview {
            quotation_id: Some(12),
            reference_number: Some(" Q-2024-12 ".into()),
            valid_till: chrono::NaiveDate::from_ymd_opt(2026, 12, 31),
            ..Default::default()
        };
        let form = QuoteFormValues {
            lines: Some(vec![]),
            ..Default::default()
        };
        let payload = assemble(&form, &overview, None).unwrap();
        assert_eq!(payload.version, 1);
        assert_eq!(payload.reference_number.as_deref(), Some("Q-2024-12"));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["validTill"], "2026-12-31");
    }

    #[test]
    fn test_idempotent_bytes() {
        let form = saved();
        let a = serde_json::to_string(&assemble(&form, &QuoteOverview::default(), None).unwrap()).unwrap();
        let b = serde_json::to_string(&assemble(&form, &QuoteOverview::default(), None).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
