//! Parser for the ledger's textual mapping values
//!
//! The read endpoint answers a mapping lookup with either a bare literal
//! (`"5u64"`) or a flat struct literal:
//!
//! ```text
//! {
//!   admin: aleo1...,
//!   name_hash: 1097035109field,
//!   active: true
//! }
//! ```
//!
//! Struct values are never nested, so a segment is split on its first colon
//! only and the remainder is kept verbatim as the value.

use serde::Serialize;

/// A decoded mapping value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireValue {
    /// A bare literal, or any text that did not parse as a struct
    Scalar(String),
    /// A flat struct literal
    Struct(StructValue),
}

impl WireValue {
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            WireValue::Struct(s) => Some(s),
            WireValue::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            WireValue::Scalar(s) => Some(s),
            WireValue::Struct(_) => None,
        }
    }

    pub fn into_struct(self) -> Option<StructValue> {
        match self {
            WireValue::Struct(s) => Some(s),
            WireValue::Scalar(_) => None,
        }
    }
}

/// Key/value pairs of a struct literal, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructValue {
    fields: Vec<(String, String)>,
}

impl StructValue {
    /// Value for `key`, untouched (visibility qualifiers included)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A repeated key keeps its first position and takes the later value
    fn insert(&mut self, key: String, value: String) {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }
}

/// Parse a raw mapping response body
///
/// `None` (the endpoint reported absence) stays `None`. Anything else
/// yields a value; malformed input degrades to [`WireValue::Scalar`].
pub fn parse_mapping_response(raw: Option<&str>) -> Option<WireValue> {
    let raw = raw?;
    let unwrapped = unwrap_json_body(raw);
    let text = collapse(&unwrapped);

    let Some(interior) = text
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Some(WireValue::Scalar(text));
    };

    let mut value = StructValue::default();
    for segment in interior.split(',') {
        let Some((key, val)) = segment.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        value.insert(key.to_string(), val.trim().to_string());
    }

    if value.is_empty() {
        Some(WireValue::Scalar(text))
    } else {
        Some(WireValue::Struct(value))
    }
}

/// Bodies usually arrive as a JSON string literal; decode that layer if present
fn unwrap_json_body(raw: &str) -> String {
    let trimmed = raw.trim();
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Bool(b)) => b.to_string(),
        Ok(serde_json::Value::Number(n)) => n.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Strip one pair of surrounding quotes and collapse all whitespace
fn collapse(text: &str) -> String {
    let text = text.strip_prefix('"').unwrap_or(text);
    let text = text.strip_suffix('"').unwrap_or(text);
    text.replace("\\n", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_struct_keeps_order() {
        let parsed = parse_mapping_response(Some("{a: 1u8, b: 2u8}")).unwrap();
        let s = parsed.as_struct().unwrap();
        assert_eq!(s.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(s.get("a"), Some("1u8"));
        assert_eq!(s.get("b"), Some("2u8"));
    }

    #[test]
    fn test_quoted_scalar() {
        let parsed = parse_mapping_response(Some("\"5u64\"")).unwrap();
        assert_eq!(parsed, WireValue::Scalar("5u64".to_string()));
    }

    #[test]
    fn test_empty_body_falls_back_to_scalar() {
        assert_eq!(
            parse_mapping_response(Some("")),
            Some(WireValue::Scalar(String::new()))
        );
        assert_eq!(
            parse_mapping_response(Some("{}")),
            Some(WireValue::Scalar("{}".to_string()))
        );
    }

    #[test]
    fn test_absence_is_none() {
        assert_eq!(parse_mapping_response(None), None);
    }

    #[test]
    fn test_json_string_body_with_escaped_newlines() {
        let body = r#""{\n  org_id: 77field,\n  severity: 2u8.public,\n  status: 0u8\n}""#;
        let parsed = parse_mapping_response(Some(body)).unwrap();
        let s = parsed.as_struct().unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.get("org_id"), Some("77field"));
        assert_eq!(s.get("severity"), Some("2u8.public"));
    }

    #[test]
    fn test_literal_backslash_n_collapses() {
        let parsed = parse_mapping_response(Some("{a: 1u8,\\n b: 2u8}")).unwrap();
        assert_eq!(parsed.as_struct().unwrap().get("b"), Some("2u8"));
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let parsed = parse_mapping_response(Some("{url: a:b:c, x: 1u8}")).unwrap();
        let s = parsed.as_struct().unwrap();
        assert_eq!(s.get("url"), Some("a:b:c"));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_repeated_key_takes_last_value_in_first_position() {
        let parsed = parse_mapping_response(Some("{x: 1u8, y: 5u8, x: 2u8}")).unwrap();
        let s = parsed.as_struct().unwrap();
        assert_eq!(s.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(s.get("x"), Some("2u8"));
        assert_eq!(s.get("y"), Some("5u8"));
    }

    #[test]
    fn test_segments_without_colon_are_skipped() {
        let parsed = parse_mapping_response(Some("{junk, a: 1u8}")).unwrap();
        assert_eq!(parsed.as_struct().unwrap().len(), 1);
    }

    #[test]
    fn test_json_boolean_body() {
        assert_eq!(
            parse_mapping_response(Some("true")),
            Some(WireValue::Scalar("true".to_string()))
        );
    }
}
