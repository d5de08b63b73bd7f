//! # Validation Module
//!
//! Validation for pricing settings before any computation runs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Settings load (THIS MODULE)                                  │
//! │  ├── precision, percentages, currency separators                       │
//! │  └── Fails fast with ValidationError                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Line ingress (crate::ingress)                                │
//! │  ├── Lenient: malformed numbers coerce to 0                            │
//! │  └── Never fails                                                        │
//! │                                                                         │
//! │  Settings are operator-controlled and wrong ones are bugs; line data   │
//! │  is user-controlled and wrong values must not block a quote.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::format::CurrencyFormat;
use crate::money::Rate;
use crate::MAX_PRECISION;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a decimal precision.
///
/// ## Rules
/// - Must be between 0 and `MAX_PRECISION` (10)
///
/// ## Example
/// ```rust
/// use meridian_core::validation::validate_precision;
///
/// assert!(validate_precision(2).is_ok());
/// assert!(validate_precision(11).is_err());
/// ```
pub fn validate_precision(precision: u32) -> ValidationResult<()> {
    if precision > MAX_PRECISION {
        return Err(ValidationError::OutOfRange {
            field: "precision".to_string(),
            min: "0".to_string(),
            max: MAX_PRECISION.to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage.
///
/// ## Rules
/// - Must be between 0 and 100 inclusive
pub fn validate_percentage(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate.percent() < Decimal::ZERO || rate.percent() > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        });
    }

    Ok(())
}

/// Validates a currency descriptor.
///
/// ## Rules
/// - Decimal separator must not be empty when precision > 0
/// - Decimal and thousands separators must differ
/// - Precision follows [`validate_precision`]
pub fn validate_currency(currency: &CurrencyFormat) -> ValidationResult<()> {
    validate_precision(currency.precision).map_err(|_| ValidationError::OutOfRange {
        field: "currency.precision".to_string(),
        min: "0".to_string(),
        max: MAX_PRECISION.to_string(),
    })?;

    if currency.precision > 0 && currency.decimal.is_empty() {
        return Err(ValidationError::Required {
            field: "currency.decimal".to_string(),
        });
    }

    if currency.decimal == currency.thousand {
        return Err(ValidationError::InvalidFormat {
            field: "currency.thousand".to_string(),
            reason: "must differ from the decimal separator".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_precision() {
        assert!(validate_precision(0).is_ok());
        assert!(validate_precision(2).is_ok());
        assert!(validate_precision(10).is_ok());
        assert!(validate_precision(11).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage("pf", Rate::ZERO).is_ok());
        assert!(validate_percentage("pf", Rate::HUNDRED).is_ok());
        assert!(validate_percentage("pf", Rate::from_f64(-1.0)).is_err());
        assert!(validate_percentage("pf", Rate::from_f64(100.5)).is_err());
    }

    #[test]
    fn test_validate_currency() {
        assert!(validate_currency(&CurrencyFormat::default()).is_ok());

        let same = CurrencyFormat {
            thousand: ".".to_string(),
            ..CurrencyFormat::default()
        };
        assert!(validate_currency(&same).is_err());

        let no_decimal = CurrencyFormat {
            decimal: String::new(),
            thousand: " ".to_string(),
            ..CurrencyFormat::default()
        };
        assert!(validate_currency(&no_decimal).is_err());
    }
}
