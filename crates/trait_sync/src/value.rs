//! Trait values and their attribute encodings.

use indexmap::IndexMap;
use serde_json::Value;

/// A trait value as held in the host's attribute map.
///
/// An absent key plays the role of "undefined"; [`Value::Null`] is "null".
pub type TraitValue = Value;

/// Insertion-ordered attribute map owned by the host document model.
pub type AttributeMap = IndexMap<String, TraitValue>;

/// Coerce a value using the HTML boolean-attribute conventions.
///
/// `true`, `"true"` and `""` are true; everything else, including absence,
/// is false.
pub fn coerce_bool(value: Option<&TraitValue>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.is_empty() || text == "true",
        Some(Value::Null | Value::Number(_) | Value::Array(_) | Value::Object(_)) | None => false,
    }
}

/// Attribute text for a value, or `None` when the attribute should be absent.
pub fn attribute_text(value: Option<&TraitValue>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other @ (Value::Array(_) | Value::Object(_)) => Some(other.to_string()),
    }
}

/// Read an attribute back as a trait value.
pub(crate) fn from_attribute(text: Option<String>) -> Option<TraitValue> {
    text.map(Value::String)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boolean_coercion_is_total() {
        for truthy in [json!(true), json!("true"), json!("")] {
            assert!(coerce_bool(Some(&truthy)), "{truthy} should be true");
        }
        for falsy in [json!(false), json!("false"), json!(null), json!("x"), json!(1)] {
            assert!(!coerce_bool(Some(&falsy)), "{falsy} should be false");
        }
        assert!(!coerce_bool(None));
    }

    #[test]
    fn attribute_text_follows_value_kind() {
        assert_eq!(attribute_text(Some(&json!("big"))).as_deref(), Some("big"));
        assert_eq!(attribute_text(Some(&json!(false))).as_deref(), Some("false"));
        assert_eq!(attribute_text(Some(&json!(3))).as_deref(), Some("3"));
        assert_eq!(attribute_text(Some(&json!(["a", 1]))).as_deref(), Some("[\"a\",1]"));
        assert_eq!(attribute_text(Some(&json!(null))), None);
        assert_eq!(attribute_text(None), None);
    }
}
