//! # Domain Types
//!
//! Canonical domain types shared by every pricing stage.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │   HsnDetails    │   │ VolumeDiscount* │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │──►│  tax            │   │  Tier (ext.)    │       │
//! │  │  seller ids     │   │  inter_tax      │   │  Obj (embedded) │       │
//! │  │  quantity       │   │  intra_tax      │   └─────────────────┘       │
//! │  │  prices         │   └─────────────────┘                             │
//! │  │  breakups       │   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  vd outputs     │   │ TaxBreakupEntry │   │   Reference     │       │
//! │  └─────────────────┘   │  name / % / cmp │   │  id + name      │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Normalized Once
//! Storefront line objects arrive with a long tail of optional, loosely
//! typed fields. [`crate::ingress`] coerces them into [`LineItem`] at the
//! boundary; every later stage works on these typed records only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{Money, Rate};

/// `kind` of the [`AdditionalDiscount`] entry written by the volume
/// discount engine.
pub const VOLUME_DISCOUNT_KIND: &str = "volume";

// =============================================================================
// Identifiers
// =============================================================================

/// A product or seller identifier.
///
/// The catalog hands out numeric ids while some seller services use
/// strings; `101` and `"101"` name the same product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Ident {
    Number(i64),
    Text(String),
}

impl Ident {
    /// Canonical lookup key. Numbers and their string form collapse.
    pub fn key(&self) -> String {
        match self {
            Ident::Number(n) => n.to_string(),
            Ident::Text(s) => s.trim().to_string(),
        }
    }

    /// True for an empty string id.
    pub fn is_blank(&self) -> bool {
        matches!(self, Ident::Text(s) if s.trim().is_empty())
    }

    /// Compares by canonical key.
    pub fn same_as(&self, other: &Ident) -> bool {
        self.key() == other.key()
    }
}

impl Default for Ident {
    fn default() -> Self {
        Ident::Text(String::new())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<i64> for Ident {
    fn from(n: i64) -> Self {
        Ident::Number(n)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Ident::Text(s.to_string())
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Ident::Text(s)
    }
}

/// A nested reference object (account owner, warehouse, tag, user, ...).
///
/// The submission API only accepts the bare `id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Reference {
    pub id: i64,
    pub name: Option<String>,
}

impl Reference {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Reference {
            id,
            name: Some(name.into()),
        }
    }
}

// =============================================================================
// Tax Metadata
// =============================================================================

/// Which jurisdictional regime applies to the whole cart/quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TaxScope {
    /// Cross-border: a single consolidated rate.
    Inter,
    /// Same jurisdiction: split components, possibly compound.
    #[default]
    Intra,
}

impl TaxScope {
    /// Maps the storefront's `isInter` flag.
    #[inline]
    pub fn from_is_inter(is_inter: bool) -> Self {
        if is_inter {
            TaxScope::Inter
        } else {
            TaxScope::Intra
        }
    }

    #[inline]
    pub fn is_inter(&self) -> bool {
        matches!(self, TaxScope::Inter)
    }
}

/// One tax as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct TaxComponent {
    pub tax_name: String,
    pub rate: Rate,
    /// Levied on the running total including earlier taxes.
    pub compound: bool,
}

/// Inter- or intra-state tax object of an HSN record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct TaxSchedule {
    pub total_tax: Rate,
    #[serde(alias = "components")]
    pub taxes: Vec<TaxComponent>,
}

/// Tax classification attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct HsnDetails {
    pub hsn_code: Option<String>,
    pub tax: Rate,
    pub inter_tax: Option<TaxSchedule>,
    pub intra_tax: Option<TaxSchedule>,
}

impl HsnDetails {
    /// Returns the schedule for `scope`, if the catalog supplied one.
    pub fn schedule(&self, scope: TaxScope) -> Option<&TaxSchedule> {
        match scope {
            TaxScope::Inter => self.inter_tax.as_ref(),
            TaxScope::Intra => self.intra_tax.as_ref(),
        }
    }
}

/// Catalog lookup row: `productId → hsnDetails`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct ProductTaxDetail {
    pub product_id: Ident,
    pub hsn_details: Option<HsnDetails>,
}

/// One entry of a line's resolved tax breakup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct TaxBreakupEntry {
    pub tax_name: String,
    pub tax_percentage: Rate,
    pub compound: bool,
}

// =============================================================================
// Discounts
// =============================================================================

/// Volume discount tier supplied by the discount service.
///
/// Tiers are a plain lookup; combination flags the service may send are
/// ignored on input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct VolumeDiscountTier {
    pub item_no: Option<i64>,
    pub product_id: Option<Ident>,
    pub applied_discount: Rate,
}

/// Volume discount embedded directly on a line item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct VolumeDiscountObj {
    pub discount_id: Option<Ident>,
    pub percentage: Rate,
    pub cannot_combine_with_other_discounts: bool,
    /// Set when a user explicitly changed the discount; forces application.
    pub disc_changed: bool,
}

/// Audit entry describing one discount contribution on a line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct AdditionalDiscount {
    pub kind: String,
    pub discount_id: Option<Ident>,
    pub percentage: Rate,
    pub amount: Money,
}

/// Special/list-price discount attached to a line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct DiscountDetails {
    pub discount_id: Option<Ident>,
    pub discount_percentage: Rate,
    pub base_price: Money,
    pub master_price: Money,
}

/// Sub-line of a bundle product.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct BundleProduct {
    pub product_id: Ident,
    pub product_name: Option<String>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[ts(type = "number")]
    pub quantity: Decimal,
    pub unit_price: Money,
    #[serde(alias = "isBundleSelected_fe")]
    pub is_bundle_selected: bool,
}

// =============================================================================
// Line Item
// =============================================================================

/// A cart/quote line.
///
/// ## Lifecycle
/// ```text
/// product added ──► LineItem ──► tax resolved ──► VD priced ──► payload
///                      │
///                      └── deleted: moved to the "removed" list and still
///                          sent so the server can reconcile it
/// ```
///
/// The input half (ids, quantity, prices, tax metadata) comes from the
/// storefront. The output half (`unit_volume_price` onwards) is written by
/// the volume discount engine on every recomputation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct LineItem {
    pub product_id: Ident,
    pub item_no: Option<i64>,
    pub line_no: Option<i64>,
    /// Not yet persisted; the server assigns `line_no`/`item_no`.
    #[serde(rename = "new")]
    pub is_new: bool,
    pub product_name: Option<String>,

    pub seller_id: Option<Ident>,
    pub vendor_id: Option<Ident>,
    pub partner_id: Option<Ident>,
    pub seller_name: Option<String>,
    pub vendor_name: Option<String>,
    pub seller_location: Option<String>,
    pub vendor_location: Option<String>,

    /// Asked quantity; fractional for weighed or metered goods.
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
    pub product_cost: Money,
    pub addon_cost: Money,
    /// Per-unit shipping charge.
    pub shipping_charges: Money,
    /// `unit_list_price` already includes tax.
    pub tax_inclusive: bool,

    pub hsn_details: Option<HsnDetails>,
    pub tax: Rate,
    pub total_inter_tax: Rate,
    pub total_intra_tax: Rate,
    pub inter_tax_breakup: Vec<TaxBreakupEntry>,
    pub intra_tax_breakup: Vec<TaxBreakupEntry>,
    /// Mirrors whichever breakup the cart's scope selected.
    pub product_taxes: Vec<TaxBreakupEntry>,

    pub bundle_products: Vec<BundleProduct>,
    pub discount_details: Option<DiscountDetails>,
    pub volume_discount_obj: Option<VolumeDiscountObj>,
    pub volume_discount_applied: bool,
    pub applied_discount: Rate,
    pub additional_discounts: Vec<AdditionalDiscount>,

    pub unit_volume_price: Money,
    pub total_volume_discount_price: Money,
    pub pf_rate: Money,
    pub item_taxable_amount: Money,
    pub dmc: Rate,
    pub margin_percentage: Rate,
    /// Effective tax percent on the line after compound stacking.
    pub tax_volume_discount_percentage: Rate,
    pub line_tax: Money,

    pub account_owner: Option<Reference>,
    pub business_unit: Option<Reference>,
    pub division: Option<Reference>,
    pub warehouse: Option<Reference>,
}

impl LineItem {
    /// Creates a line with the fields every test and caller needs.
    pub fn new(product_id: impl Into<Ident>, quantity: Decimal, unit_list_price: Money) -> Self {
        LineItem {
            product_id: product_id.into(),
            quantity,
            unit_list_price,
            unit_price: unit_list_price,
            ..Default::default()
        }
    }

    /// Sets the seller id.
    pub fn with_seller(mut self, seller_id: impl Into<Ident>) -> Self {
        self.seller_id = Some(seller_id.into());
        self
    }

    /// Sets the HSN tax metadata.
    pub fn with_hsn(mut self, hsn: HsnDetails) -> Self {
        self.hsn_details = Some(hsn);
        self
    }

    /// Returns the breakup selected for `scope`.
    pub fn breakup(&self, scope: TaxScope) -> &[TaxBreakupEntry] {
        match scope {
            TaxScope::Inter => &self.inter_tax_breakup,
            TaxScope::Intra => &self.intra_tax_breakup,
        }
    }

    /// Unit price before any volume discount.
    ///
    /// A line that went through volume pricing carries a discounted (or
    /// tax-excluded) `unit_price`; its list price is the base again.
    pub fn pre_volume_unit_price(&self) -> Money {
        if self.volume_discount_applied || self.tax_inclusive {
            self.unit_list_price
        } else {
            self.unit_price
        }
    }

    /// Returns the consolidated rate recorded for `scope`.
    pub fn total_tax_for(&self, scope: TaxScope) -> Rate {
        match scope {
            TaxScope::Inter => self.total_inter_tax,
            TaxScope::Intra => self.total_intra_tax,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
