//! # meridian-core: Pure Pricing Logic for Meridian B2B Storefront
//!
//! This crate turns cart line items (possibly from many sellers) into a
//! priced, taxed, discounted total and then into the order/quote
//! submission payload. It contains pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Meridian Storefront Pricing                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Storefront / meridian-cli                       │   │
//! │  │     owns state, files, env, logging; calls recompute()          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ QuoteSnapshot                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ meridian-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ingress ──► tax ──► discount ──► seller/cart ──► quotation     │   │
//! │  │  (coerce)   (HSN)    (VD A/B)     (group, roll)   (payload)     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ QuotationPayload                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 Order / Quote submission API                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`tax`] - Tax breakup resolution (inter/intra, compound ordering, exemption)
//! - [`discount`] - Volume discount engine (tiered and embedded modes)
//! - [`seller`] - Seller grouping, per-seller pricing, pricing-source fallback
//! - [`cart`] - Plain cart totals
//! - [`quotation`] - Submission payload assembly
//! - [`snapshot`] - Immutable snapshot recompute entry point
//! - [`ingress`] - Lenient normalization of raw storefront lines
//! - [`money`] - Decimal `Money` and `Rate` with explicit half-up rounding
//! - [`types`] - Canonical `LineItem` and tax/discount metadata
//! - [`config`] - Pricing settings
//! - [`format`] - Currency display formatting
//! - [`validation`] - Settings validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same snapshot in, same result out
//! 2. **No I/O**: reading files and environment is the caller's job
//! 3. **Decimal Money**: every monetary boundary rounds explicitly
//! 4. **Degrade, Don't Fail**: bad line data becomes zero, never an error
//!
//! ## Example Usage
//!
//! ```rust
//! use meridian_core::quotation::assemble;
//! use meridian_core::snapshot::{recompute, QuoteSnapshot};
//! use meridian_core::money::Money;
//! use meridian_core::types::LineItem;
//! use rust_decimal::Decimal;
//!
//! let snapshot = QuoteSnapshot {
//!     lines: vec![LineItem::new(1, Decimal::TWO, Money::from_major(50)).with_seller("s1")],
//!     ..Default::default()
//! };
//!
//! let result = recompute(&snapshot);
//! let form = result.form_values(&snapshot.form, &snapshot);
//! let payload = assemble(&form, &snapshot.overview, None).unwrap();
//!
//! assert_eq!(payload.totals.grand_total, Money::from_major(100));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod config;
pub mod discount;
pub mod error;
pub mod format;
pub mod ingress;
pub mod money;
pub mod quotation;
pub mod seller;
pub mod snapshot;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meridian_core::Money` instead of
// `use meridian_core::money::Money`

pub use config::PricingSettings;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Rate};
pub use quotation::{assemble, QuotationPayload};
pub use snapshot::{recompute, QuoteSnapshot, Recomputation};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Decimal places used when settings do not say otherwise.
pub const DEFAULT_PRECISION: u32 = 2;

/// Largest accepted precision.
///
/// ## Business Reason
/// No currency or unit of measure in the storefront needs more, and
/// `Decimal` keeps ample headroom for quantity × price at this scale.
pub const MAX_PRECISION: u32 = 10;

/// Group key for lines with no seller, vendor or partner id.
pub const NO_SELLER_KEY: &str = "no-seller";

/// Pricing-table key holding rows that apply to any seller.
pub const NO_SELLER_PRICING_KEY: &str = "no-seller-id";

/// Seller display name when no line carries one.
pub const UNKNOWN_SELLER: &str = "Unknown Seller";

/// Seller display location when no line carries one.
pub const LOCATION_NOT_SPECIFIED: &str = "Location not specified";
