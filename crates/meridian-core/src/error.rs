//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meridian-core errors (this file)                                      │
//! │  ├── CoreError        - Contract violations & must-block conditions    │
//! │  └── ValidationError  - Settings/input validation failures             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → caller (storefront / CLI)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT an Error
//! Data-shape problems never surface here. A product missing from the tax
//! lookup, a line without a list price or a tier that cannot combine all
//! degrade to zero/empty values and are logged with `tracing`. Only
//! programming-contract violations and the explicit order-blocking checks
//! produce a `CoreError`.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core pricing errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The assembler was called with no line-item container at all.
    ///
    /// ## When This Occurs
    /// - Neither the current form nor the previously saved quote carries
    ///   a `lines` list (an empty list is fine)
    #[error("Quotation has no line-item container")]
    MissingLineItems,

    /// Order placement must block: some lines have no usable price.
    ///
    /// ## User Workflow
    /// ```text
    /// Place Order
    ///      │
    ///      ▼
    /// resolve_all_pricing() → products_without_pricing = ["P-9"]
    ///      │
    ///      ▼
    /// PricingUnavailable { products: ["P-9"] }
    ///      │
    ///      ▼
    /// UI shows: "Price not available for P-9"
    /// ```
    #[error("Price not available for: {}", products.join(", "))]
    PricingUnavailable { products: Vec<String> },

    /// Settings text is not valid TOML for `PricingSettings`.
    #[error("Cannot parse pricing settings: {0}")]
    SettingsParse(#[from] toml::de::Error),

    /// Snapshot JSON does not have the expected top-level shape.
    #[error("Malformed quote snapshot: {0}")]
    MalformedSnapshot(#[from] serde_json::Error),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used while loading settings, before any pricing runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
