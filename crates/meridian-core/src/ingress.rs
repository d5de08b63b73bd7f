//! # Ingress Normalization
//!
//! Storefront line objects are loosely typed: prices arrive as numbers or
//! numeric strings, flags as `true`, `1` or `"1"`, and most fields may be
//! `null`. This module coerces raw JSON into [`LineItem`] once, so the rest
//! of the crate never sees a malformed value.
//!
//! ## Coercion Rules
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────────┐
//! │ Input                │ Result                                           │
//! ├──────────────────────┼──────────────────────────────────────────────────┤
//! │ null                 │ field dropped, serde default applies             │
//! │ "12.50" (numeric)    │ 12.50                                            │
//! │ "abc", true, [], {}  │ 0 for numeric fields                             │
//! │ 1 / "1" / "true"     │ true for flag fields                             │
//! │ askedQuantity        │ replaces quantity                                │
//! │ negative quantity    │ 0                                                │
//! │ no unitPrice         │ unitListPrice                                    │
//! └──────────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! A line that still fails to deserialize degrades to a minimal line with
//! its id, quantity and list price. Nothing here fails.

use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::money::Money;
use crate::types::{Ident, LineItem};

/// Fields read as decimals, at any depth.
const DECIMAL_FIELDS: &[&str] = &[
    "quantity",
    "askedQuantity",
    "packagingQty",
    "minOrderQuantity",
    "unitListPrice",
    "unitPrice",
    "totalPrice",
    "productCost",
    "addonCost",
    "shippingCharges",
    "tax",
    "totalInterTax",
    "totalIntraTax",
    "totalTax",
    "rate",
    "taxPercentage",
    "percentage",
    "appliedDiscount",
    "discountPercentage",
    "basePrice",
    "masterPrice",
    "amount",
    "unitVolumePrice",
    "totalVolumeDiscountPrice",
    "pfRate",
    "itemTaxableAmount",
    "dmc",
    "marginPercentage",
    "taxVolumeDiscountPercentage",
    "lineTax",
];

/// Fields read as integers; unparseable values are dropped.
const INTEGER_FIELDS: &[&str] = &["itemNo", "lineNo", "id"];

/// Fields read as flags.
const FLAG_FIELDS: &[&str] = &[
    "new",
    "taxInclusive",
    "compound",
    "isBundleSelected",
    "isBundleSelected_fe",
    "cannotCombineWithOtherDiscounts",
    "discChanged",
    "volumeDiscountApplied",
];

/// Fields holding a product/seller identifier (number or string).
const IDENT_FIELDS: &[&str] = &[
    "productId",
    "sellerId",
    "vendorId",
    "partnerId",
    "discountId",
];

// =============================================================================
// Value Coercion
// =============================================================================

fn coerce_decimal(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::String(s) => match s.trim().parse::<Decimal>() {
            Ok(_) => Value::String(s.trim().to_string()),
            Err(_) => Value::from(0),
        },
        _ => Value::from(0),
    }
}

fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() => Some(value.clone()),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| Value::Number(Number::from(f as i64))),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn coerce_flag(value: &Value) -> Value {
    let flag = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    };
    Value::Bool(flag)
}

fn coerce_ident(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() => Some(value.clone()),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::String(_) => Some(value.clone()),
        _ => None,
    }
}

/// Recursively drops nulls and coerces known fields.
///
/// ```rust
/// use meridian_core::ingress::normalize_value;
/// use serde_json::json;
///
/// let raw = json!({ "unitPrice": "12.5", "new": 1, "itemNo": "7", "hsnDetails": null });
/// let clean = normalize_value(&raw);
/// assert_eq!(clean, json!({ "unitPrice": "12.5", "new": true, "itemNo": 7 }));
/// ```
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_object(map)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(normalize_value)
                .collect(),
        ),
        other => other.clone(),
    }
}

fn normalize_object(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len());

    for (key, value) in map {
        if value.is_null() {
            continue;
        }
        let key_str = key.as_str();
        let coerced = if DECIMAL_FIELDS.contains(&key_str) {
            Some(coerce_decimal(value))
        } else if INTEGER_FIELDS.contains(&key_str) {
            coerce_integer(value)
        } else if FLAG_FIELDS.contains(&key_str) {
            Some(coerce_flag(value))
        } else if IDENT_FIELDS.contains(&key_str) {
            coerce_ident(value)
        } else {
            Some(normalize_value(value))
        };

        if let Some(coerced) = coerced {
            out.insert(key.clone(), coerced);
        }
    }

    out
}

// =============================================================================
// Line Normalization
// =============================================================================

fn quantity_of(map: &Map<String, Value>) -> Decimal {
    let raw = map.get("askedQuantity").or_else(|| map.get("quantity"));
    let quantity = raw.map(decimal_of).unwrap_or(Decimal::ZERO);
    if quantity < Decimal::ZERO {
        warn!(%quantity, "Negative quantity on line, using 0");
        return Decimal::ZERO;
    }
    quantity
}

fn decimal_of(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .or_else(|_| Decimal::try_from(n.as_f64().unwrap_or(0.0)))
            .unwrap_or(Decimal::ZERO),
        Value::String(s) => s.parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

fn minimal_line(map: &Map<String, Value>) -> LineItem {
    let product_id = map
        .get("productId")
        .and_then(|v| serde_json::from_value::<Ident>(v.clone()).ok())
        .unwrap_or_default();
    let list_price = map
        .get("unitListPrice")
        .map(|v| Money::new(decimal_of(v)))
        .unwrap_or_default();
    LineItem::new(product_id, quantity_of(map), list_price)
}

/// Normalizes one raw storefront line.
pub fn normalize_line(raw: &Value) -> LineItem {
    let Value::Object(map) = normalize_value(raw) else {
        warn!("Line is not a JSON object, using an empty line");
        return LineItem::default();
    };

    let mut map = map;
    let quantity = quantity_of(&map);
    map.remove("askedQuantity");
    map.insert("quantity".to_string(), Value::String(quantity.to_string()));
    if !map.contains_key("unitPrice") {
        if let Some(list_price) = map.get("unitListPrice").cloned() {
            map.insert("unitPrice".to_string(), list_price);
        }
    }

    match serde_json::from_value::<LineItem>(Value::Object(map.clone())) {
        Ok(line) => line,
        Err(error) => {
            warn!(%error, "Malformed line, keeping id, quantity and list price only");
            minimal_line(&map)
        }
    }
}

/// Normalizes raw storefront lines. Never drops a line.
pub fn normalize_lines(raw: &[Value]) -> Vec<LineItem> {
    raw.iter().map(normalize_line).collect()
}
