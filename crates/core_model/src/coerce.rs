//! Parse-with-fallback primitives for partially-trustworthy upstream data.
//!
//! Captured payloads arrive with monetary values as numbers, numeric strings,
//! or nothing at all. These helpers coerce instead of rejecting so a malformed
//! field degrades one parameter, not the whole delivery.

use serde_json::Value;

/// Coerce a captured monetary value into a finite number, defaulting to zero.
pub fn money(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Integer quantity, never below one.
pub fn quantity(value: Option<&Value>) -> i64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().map(|v| v as i64),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|v| v as i64),
        _ => None,
    };
    parsed.unwrap_or(1).max(1)
}

/// Unit price, never below zero.
pub fn unit_price(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0)
}

/// A trimmed, non-empty string view of a field. Numeric identifiers are
/// stringified so legacy integer ids survive.
pub fn non_empty_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn money_coercion_table() {
        assert_eq!(money(&json!(42.5)), 42.5);
        assert_eq!(money(&json!("19.99")), 19.99);
        assert_eq!(money(&json!("  7 ")), 7.0);
        assert_eq!(money(&json!("not a number")), 0.0);
        assert_eq!(money(&Value::Null), 0.0);
        assert_eq!(money(&json!({"amount": 5})), 0.0);
    }

    #[test]
    fn quantity_floors_at_one() {
        assert_eq!(quantity(Some(&json!(3))), 3);
        assert_eq!(quantity(Some(&json!("2"))), 2);
        assert_eq!(quantity(Some(&json!(0))), 1);
        assert_eq!(quantity(Some(&json!(-4))), 1);
        assert_eq!(quantity(Some(&json!("junk"))), 1);
        assert_eq!(quantity(None), 1);
    }

    #[test]
    fn unit_price_floors_at_zero() {
        assert_eq!(unit_price(Some(&json!(12.0))), 12.0);
        assert_eq!(unit_price(Some(&json!("3.5"))), 3.5);
        assert_eq!(unit_price(Some(&json!(-1.0))), 0.0);
        assert_eq!(unit_price(None), 0.0);
    }

    #[test]
    fn non_empty_string_stringifies_numbers() {
        assert_eq!(
            non_empty_string(Some(&json!("abc"))),
            Some("abc".to_string())
        );
        assert_eq!(
            non_empty_string(Some(&json!(12345))),
            Some("12345".to_string())
        );
        assert_eq!(non_empty_string(Some(&json!("   "))), None);
        assert_eq!(non_empty_string(Some(&json!(true))), None);
        assert_eq!(non_empty_string(None), None);
    }
}
