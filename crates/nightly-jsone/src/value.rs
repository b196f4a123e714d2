//! Value helpers shared by the interpreter and the renderer.

use serde_json::{Number, Value};

use crate::error::{RenderError, Result};

/// JSON-e truthiness: `false`, `null`, `0`, `""`, `[]` and `{}` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Convert a float into a JSON number, keeping integral values integral.
pub fn number_value(n: f64) -> Result<Value> {
    if !n.is_finite() {
        return Err(RenderError::interpreter(format!(
            "arithmetic produced a non-finite number ({n})"
        )));
    }
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return Ok(Value::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| RenderError::interpreter(format!("cannot represent number {n}")))
}

pub fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// String form used by `${...}` interpolation and the `str` builtin.
pub fn to_display_string(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(format_number(n)),
        Value::String(s) => Ok(s.clone()),
        Value::Array(_) | Value::Object(_) => Err(RenderError::interpreter(format!(
            "cannot convert {} to a string",
            type_name(value)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(0.5), json!("x"), json!([0]), json!({"a": null})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_number_value_keeps_integers_integral() {
        assert_eq!(number_value(3.0).unwrap(), json!(3));
        assert_eq!(number_value(-2.0).unwrap(), json!(-2));
        assert_eq!(number_value(2.5).unwrap(), json!(2.5));
        assert!(number_value(f64::INFINITY).is_err());
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(to_display_string(&json!(null)).unwrap(), "null");
        assert_eq!(to_display_string(&json!(true)).unwrap(), "true");
        assert_eq!(to_display_string(&json!(7.0)).unwrap(), "7");
        assert_eq!(to_display_string(&json!(1.25)).unwrap(), "1.25");
        assert!(to_display_string(&json!([1])).is_err());
    }
}
