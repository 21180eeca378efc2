//! Boundary normalization for loose JSON shapes
//!
//! The legacy admin panel stored the blog `hashtags` field as whatever the
//! editor happened to send: sometimes an array of strings, sometimes one
//! comma- or space-delimited string, with or without `#` prefixes. All of
//! that is coerced to one canonical `Vec<String>` here, at the boundary,
//! so nothing downstream branches on the shape. Anything that is not a
//! string or an array of strings is rejected.

use serde_json::Value;

use crate::types::{AtriumError, Result};

/// Canonicalize a hashtags value to a list of bare, non-empty tags
pub fn hashtags(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => {
            let mut tags = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => {
                        if let Some(tag) = clean_tag(s) {
                            tags.push(tag);
                        }
                    }
                    other => {
                        return Err(AtriumError::Validation(format!(
                            "hashtags entries must be strings, got {}",
                            type_name(other)
                        )))
                    }
                }
            }
            Ok(tags)
        }
        Value::String(s) => Ok(s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter_map(clean_tag)
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(AtriumError::Validation(format!(
            "hashtags must be a string or an array of strings, got {}",
            type_name(other)
        ))),
    }
}

fn clean_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches('#').trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_of_strings_passes_through() {
        let tags = hashtags(&json!(["masonry", "timber"])).unwrap();
        assert_eq!(tags, vec!["masonry", "timber"]);
    }

    #[test]
    fn test_delimited_string_is_split() {
        let tags = hashtags(&json!("#masonry, timber  concrete")).unwrap();
        assert_eq!(tags, vec!["masonry", "timber", "concrete"]);
    }

    #[test]
    fn test_hash_prefixes_and_blanks_are_dropped() {
        let tags = hashtags(&json!(["  #steel ", "", "   "])).unwrap();
        assert_eq!(tags, vec!["steel"]);
    }

    #[test]
    fn test_null_is_empty() {
        assert!(hashtags(&json!(null)).unwrap().is_empty());
    }

    #[test]
    fn test_non_string_shapes_are_rejected() {
        assert!(matches!(
            hashtags(&json!(42)),
            Err(AtriumError::Validation(_))
        ));
        assert!(matches!(
            hashtags(&json!(["ok", 7])),
            Err(AtriumError::Validation(_))
        ));
        assert!(matches!(
            hashtags(&json!({"a": 1})),
            Err(AtriumError::Validation(_))
        ));
    }
}
