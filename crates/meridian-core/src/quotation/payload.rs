//! Submission payload DTOs and the mapping from priced lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::cart::PricingResult;
use crate::discount::VdDetails;
use crate::money::{Money, Rate};
use crate::types::{AdditionalDiscount, Ident, LineItem, Reference, TaxBreakupEntry, TaxScope};

use super::Address;

// =============================================================================
// Totals
// =============================================================================

/// Top-level financial block of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PayloadTotals {
    pub sub_total: Money,
    /// Only present when volume discount is applied.
    #[serde(rename = "subTotalWithVD", skip_serializing_if = "Option::is_none", default)]
    pub sub_total_with_vd: Option<Money>,
    pub overall_tax: Money,
    pub taxable_amount: Money,
    pub pf_rate: Money,
    pub overall_shipping: Money,
    pub insurance_charges: Money,
    pub calculated_total: Money,
    pub grand_total: Money,
    pub rounding_adjustment: Money,
}

/// Picks the totals source. This is the only place that decides.
///
/// ```text
/// vd_applied && vd present ──► VdDetails (+ subTotalWithVD)
/// otherwise                ──► PricingResult
/// ```
///
/// ```rust
/// use meridian_core::cart::PricingResult;
/// use meridian_core::discount::VdDetails;
/// use meridian_core::money::Money;
/// use meridian_core::quotation::select_totals;
///
/// let cart = PricingResult { grand_total: Money::from_major(100), ..Default::default() };
/// let vd = VdDetails { grand_total: Money::from_major(90), ..Default::default() };
///
/// assert_eq!(select_totals(true, &cart, Some(&vd)).grand_total, Money::from_major(90));
/// assert_eq!(select_totals(false, &cart, Some(&vd)).grand_total, Money::from_major(100));
/// ```
pub fn select_totals(vd_applied: bool, cart: &PricingResult, vd: Option<&VdDetails>) -> PayloadTotals {
    match (vd_applied, vd) {
        (true, Some(vd)) => PayloadTotals {
            sub_total: vd.sub_total,
            sub_total_with_vd: Some(vd.sub_total_volume),
            overall_tax: vd.overall_tax,
            taxable_amount: vd.taxable_amount,
            pf_rate: vd.pf_rate,
            overall_shipping: vd.overall_shipping,
            insurance_charges: vd.insurance_charges,
            calculated_total: vd.calculated_total,
            grand_total: vd.grand_total,
            rounding_adjustment: vd.rounding_adjustment,
        },
        (vd_applied, _) => {
            if vd_applied {
                warn!("Volume discount flagged without details, using cart totals");
            }
            PayloadTotals {
                sub_total: cart.total_value,
                sub_total_with_vd: None,
                overall_tax: cart.total_tax,
                taxable_amount: cart.taxable_amount,
                pf_rate: cart.pf_rate,
                overall_shipping: cart.total_shipping,
                insurance_charges: cart.insurance_charges,
                calculated_total: cart.calculated_total,
                grand_total: cart.grand_total,
                rounding_adjustment: cart.rounding_adjustment,
            }
        }
    }
}

// =============================================================================
// Lines
// =============================================================================

/// A discount row on a payload line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductDiscount {
    /// Wire name is fixed by the submission API.
    #[serde(rename = "discounId")]
    pub discount_id: Ident,
    pub discount_percentage: Rate,
    pub base_price: Money,
    pub master_price: Money,
}

/// A selected bundle sub-product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PayloadBundleProduct {
    pub product_id: Ident,
    pub product_name: Option<String>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[ts(type = "number")]
    pub quantity: Decimal,
    pub unit_price: Money,
    /// 1 when selected.
    pub is_bundle_selected: u8,
}

/// One line as the submission API expects it: references flattened to
/// bare ids, taxes and discounts as flat arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PayloadLine {
    /// `null` for new lines; the server assigns it.
    pub line_no: Option<i64>,
    /// `null` for new lines; the server assigns it.
    pub item_no: Option<i64>,
    pub product_id: Ident,
    pub product_name: Option<String>,
    pub seller_id: Option<Ident>,
    pub vendor_id: Option<Ident>,

    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[ts(type = "number")]
    pub quantity: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[ts(type = "number")]
    pub packaging_qty: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[ts(type = "number")]
    pub min_order_quantity: Decimal,

    pub unit_list_price: Money,
    pub unit_price: Money,
    pub total_price: Money,
    pub shipping_charges: Money,

    pub tax: Rate,
    pub total_inter_tax: Rate,
    pub total_intra_tax: Rate,
    pub product_taxes: Vec<TaxBreakupEntry>,

    pub product_discounts: Vec<ProductDiscount>,
    pub additional_discounts: Vec<AdditionalDiscount>,
    pub volume_discount_applied: bool,
    pub applied_discount: Rate,
    pub unit_volume_price: Money,
    pub total_volume_discount_price: Money,
    pub pf_rate: Money,
    pub item_taxable_amount: Money,
    pub dmc: Rate,
    pub margin_percentage: Rate,

    pub bundle_products: Vec<PayloadBundleProduct>,

    pub account_owner_id: Option<i64>,
    pub business_unit_id: Option<i64>,
    pub division_id: Option<i64>,
    pub order_ware_house_id: Option<i64>,
    pub order_ware_house_name: Option<String>,
}

fn id_of(reference: &Option<Reference>) -> Option<i64> {
    reference.as_ref().map(|r| r.id)
}

impl PayloadLine {
    /// Flattens a priced line for `scope`.
    pub fn from_line(line: &LineItem, scope: TaxScope) -> Self {
        let (line_no, item_no) = if line.is_new {
            (None, None)
        } else {
            (line.line_no, line.item_no)
        };

        let product_discounts = line
            .discount_details
            .as_ref()
            .and_then(|d| {
                d.discount_id.as_ref().filter(|id| !id.is_blank()).map(|id| ProductDiscount {
                    discount_id: id.clone(),
                    discount_percentage: d.discount_percentage,
                    base_price: d.base_price,
                    master_price: d.master_price,
                })
            })
            .into_iter()
            .collect();

        let bundle_products = line
            .bundle_products
            .iter()
            .filter(|b| b.is_bundle_selected)
            .map(|b| PayloadBundleProduct {
                product_id: b.product_id.clone(),
                product_name: b.product_name.clone(),
                quantity: b.quantity,
                unit_price: b.unit_price,
                is_bundle_selected: 1,
            })
            .collect();

        PayloadLine {
            line_no,
            item_no,
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            seller_id: line.seller_id.clone(),
            vendor_id: line.vendor_id.clone(),
            quantity: line.quantity,
            packaging_qty: line.packaging_qty,
            min_order_quantity: line.min_order_quantity,
            unit_list_price: line.unit_list_price,
            unit_price: line.unit_price,
            total_price: line.total_price,
            shipping_charges: line.shipping_charges,
            tax: line.tax,
            total_inter_tax: line.total_inter_tax,
            total_intra_tax: line.total_intra_tax,
            product_taxes: line.breakup(scope).to_vec(),
            product_discounts,
            additional_discounts: line.additional_discounts.clone(),
            volume_discount_applied: line.volume_discount_applied,
            applied_discount: line.applied_discount,
            unit_volume_price: line.unit_volume_price,
            total_volume_discount_price: line.total_volume_discount_price,
            pf_rate: line.pf_rate,
            item_taxable_amount: line.item_taxable_amount,
            dmc: line.dmc,
            margin_percentage: line.margin_percentage,
            bundle_products,
            account_owner_id: id_of(&line.account_owner),
            business_unit_id: id_of(&line.business_unit),
            division_id: id_of(&line.division),
            order_ware_house_id: id_of(&line.warehouse),
            order_ware_house_name: line.warehouse.as_ref().and_then(|w| w.name.clone()),
        }
    }
}

// =============================================================================
// Payload
// =============================================================================

/// The assembled order/quote submission body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuotationPayload {
    pub quotation_id: Option<i64>,
    pub version: i64,
    pub reference_number: Option<String>,
    pub quote_name: Option<String>,
    pub buyer_company_id: Option<i64>,
    pub buyer_branch_id: Option<i64>,
    pub seller_company_id: Option<i64>,
    pub seller_branch_id: Option<i64>,
    pub currency_id: Option<i64>,
    /// `YYYY-MM-DD`.
    #[ts(as = "Option<String>")]
    pub valid_till: Option<chrono::NaiveDate>,

    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    pub terms: Option<String>,
    pub additional_terms: Option<String>,
    pub comment: Option<String>,

    pub quote_users: Vec<i64>,
    pub deletable_quote_users: Vec<i64>,
    pub tags: Vec<i64>,
    pub deletable_tags: Vec<i64>,

    pub is_inter: bool,
    pub tax_exemption: bool,
    #[serde(rename = "VDapplied")]
    pub vd_applied: bool,
    #[serde(flatten)]
    pub totals: PayloadTotals,

    pub quotation_details: Vec<PayloadLine>,
    pub removed_quotation_details: Vec<PayloadLine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BundleProduct, DiscountDetails};

    #[test]
    fn test_select_totals_vd_branch() {
        let cart = PricingResult {
            total_value: Money::from_major(1000),
            grand_total: Money::from_major(1180),
            ..Default::default()
        };
        let vd = VdDetails {
            sub_total: Money::from_major(1000),
            sub_total_volume: Money::from_major(900),
            grand_total: Money::from_major(1062),
            ..Default::default()
        };

        let with_vd = select_totals(true, &cart, Some(&vd));
        assert_eq!(with_vd.grand_total, vd.grand_total);
        assert_eq!(with_vd.sub_total_with_vd, Some(Money::from_major(900)));

        let plain = select_totals(false, &cart, Some(&vd));
        assert_eq!(plain.grand_total, cart.grand_total);
        assert_eq!(plain.sub_total, Money::from_major(1000));
        assert!(plain.sub_total_with_vd.is_none());

        let missing = select_totals(true, &cart, None);
        assert_eq!(missing.grand_total, cart.grand_total);
    }

    #[test]
    fn test_sub_total_with_vd_only_serialized_when_set() {
        let plain = serde_json::to_value(PayloadTotals::default()).unwrap();
        assert!(plain.get("subTotalWithVD").is_none());

        let vd = PayloadTotals {
            sub_total_with_vd: Some(Money::from_major(5)),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(vd).unwrap()["subTotalWithVD"], 5.0);
    }

    fn line() -> LineItem {
        let mut line = LineItem::new(10, Decimal::TWO, Money::from_major(25));
        line.line_no = Some(3);
        line.item_no = Some(30);
        line.account_owner = Some(Reference::new(7, "Owner"));
        line.warehouse = Some(Reference::new(2, "Main WH"));
        line.intra_tax_breakup = vec![TaxBreakupEntry {
            tax_name: "CGST".into(),
            tax_percentage: Rate::from_percent(Decimal::from(9)),
            compound: false,
        }];
        line.bundle_products = vec![
            BundleProduct {
                product_id: Ident::Number(1),
                is_bundle_selected: true,
                ..Default::default()
            },
            BundleProduct {
                product_id: Ident::Number(2),
                ..Default::default()
            },
        ];
        line
    }

    #[test]
    fn test_line_flattening() {
        let mapped = PayloadLine::from_line(&line(), TaxScope::Intra);
        assert_eq!((mapped.line_no, mapped.item_no), (Some(3), Some(30)));
        assert_eq!(mapped.account_owner_id, Some(7));
        assert_eq!(mapped.order_ware_house_id, Some(2));
        assert_eq!(mapped.order_ware_house_name.as_deref(), Some("Main WH"));
        assert_eq!(mapped.business_unit_id, None);
        assert_eq!(mapped.product_taxes.len(), 1);
        assert_eq!(mapped.bundle_products.len(), 1);
        assert_eq!(mapped.bundle_products[0].is_bundle_selected, 1);
        assert!(mapped.product_discounts.is_empty());

        let inter = PayloadLine::from_line(&line(), TaxScope::Inter);
        assert!(inter.product_taxes.is_empty());
    }

    #[test]
    fn test_new_line_drops_identifiers() {
        let mut new_line = line();
        new_line.is_new = true;
        let mapped = PayloadLine::from_line(&new_line, TaxScope::Intra);
        assert_eq!((mapped.line_no, mapped.item_no), (None, None));

        let json = serde_json::to_value(&mapped).unwrap();
        assert!(json["lineNo"].is_null());
        assert!(json["itemNo"].is_null());
    }

    #[test]
    fn test_discount_details_mapping() {
        let mut discounted = line();
        discounted.discount_details = Some(DiscountDetails {
            discount_id: Some(Ident::Number(55)),
            discount_percentage: Rate::from_percent(Decimal::from(5)),
            base_price: Money::from_major(25),
            master_price: Money::from_major(30),
        });
        let mapped = PayloadLine::from_line(&discounted, TaxScope::Intra);
        let json = serde_json::to_value(&mapped).unwrap();
        assert_eq!(json["productDiscounts"][0]["discounId"], 55);
        assert_eq!(json["productDiscounts"][0]["masterPrice"], 30.0);

        discounted.discount_details = Some(DiscountDetails::default());
        assert!(PayloadLine::from_line(&discounted, TaxScope::Intra)
            .product_discounts
            .is_empty());
    }
}
