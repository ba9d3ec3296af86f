//! Loose scalar coercion for option bags.
//!
//! Option bags come from TOML files, environment variables and JSON
//! payloads, so the same setting may arrive as a bool, a number or text.

use serde_json::{Map, Value};

/// A free-form option bag (`{"api_key": "...", "use_ssl": true}`).
pub type Options = Map<String, Value>;

/// Looks up `key`, treating an explicit `null` the same as a missing key.
pub fn present<'a>(options: &'a Options, key: &str) -> Option<&'a Value> {
    options.get(key).filter(|v| !v.is_null())
}

/// Text form of a scalar. Arrays and objects have no text form.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "" }.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// Non-negative integer form of a scalar; text is parsed, fractions truncate.
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(u64::from(*b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthy_follows_config_conventions() {
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("yes")));
        assert!(!truthy(&json!("false")));
        assert!(!truthy(&json!("0")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(null)));
    }

    #[test]
    fn counts_accept_numbers_and_text() {
        assert_eq!(as_count(&json!(42)), Some(42));
        assert_eq!(as_count(&json!("17")), Some(17));
        assert_eq!(as_count(&json!(3.9)), Some(3));
        assert_eq!(as_count(&json!(-2)), None);
        assert_eq!(as_count(&json!([1])), None);
    }

    #[test]
    fn null_counts_as_absent() {
        let mut options = Options::new();
        options.insert("code".into(), Value::Null);
        options.insert("name".into(), json!("idx"));
        assert!(present(&options, "code").is_none());
        assert_eq!(present(&options, "name"), Some(&json!("idx")));
        assert_eq!(as_text(&json!(7)), Some("7".to_string()));
    }
}
