//! Dot-path extraction and option flattening.

use formwork_types::{OptionMapping, OptionPair};
use serde_json::Value;

/// Extract a nested value from `value` by walking a dot-separated `path`.
///
/// Empty segments are skipped, so `"a..b"` behaves like `"a.b"`. The walk
/// descends through objects only; any miss returns `None` immediately, with no
/// partial or fuzzy matching. An empty path or a non-object root is `None`.
pub fn extract<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.').filter(|s| !s.is_empty()).peekable();
    segments.peek()?;

    let mut current = value;
    for segment in segments {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Extract the canonical value of a selected option object per the field's
/// `advanced.entity` path. Without an entity path, the option itself is the
/// value.
pub fn entity_value(option: &Value, entity: Option<&str>) -> Value {
    match entity {
        Some(path) => extract(option, path).cloned().unwrap_or(Value::Null),
        None => option.clone(),
    }
}

fn scalar_to_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Flatten a raw option array into label/value pairs.
///
/// Scalar items become their own label and value. Object items are mapped
/// through the `mapping` paths (defaulting to `label`/`value` keys); an item
/// whose value path misses keeps the whole object as its value, and a missing
/// label falls back to the stringified value. `reverse` flips the final order
/// (year lists are declared ascending but rendered newest-first).
pub fn flatten_options(
    values: &[Value],
    mapping: Option<&OptionMapping>,
    reverse: bool,
) -> Vec<OptionPair> {
    let label_path = mapping.map(|m| m.label.as_str()).unwrap_or("label");
    let value_path = mapping.map(|m| m.value.as_str()).unwrap_or("value");

    let mut options: Vec<OptionPair> = values
        .iter()
        .map(|item| match item {
            Value::Object(_) => {
                let value = extract(item, value_path)
                    .cloned()
                    .unwrap_or_else(|| item.clone());
                let label = extract(item, label_path)
                    .and_then(scalar_to_label)
                    .or_else(|| scalar_to_label(&value))
                    .unwrap_or_default();
                OptionPair { label, value }
            }
            other => OptionPair {
                label: scalar_to_label(other).unwrap_or_default(),
                value: other.clone(),
            },
        })
        .collect();

    if reverse {
        options.reverse();
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_nested_path() {
        let value = json!({"user": {"address": {"city": "NYC"}}});
        assert_eq!(extract(&value, "user.address.city"), Some(&json!("NYC")));
    }

    #[test]
    fn extract_missing_key_is_none() {
        assert_eq!(extract(&json!({}), "a.b"), None);
        assert_eq!(extract(&json!({"a": {"x": 1}}), "a.b"), None);
    }

    #[test]
    fn extract_empty_path_is_none() {
        assert_eq!(extract(&json!({"a": 1}), ""), None);
        assert_eq!(extract(&json!({"a": 1}), "..."), None);
    }

    #[test]
    fn extract_does_not_descend_scalars_or_arrays() {
        assert_eq!(extract(&json!({"a": "leaf"}), "a.b"), None);
        assert_eq!(extract(&json!({"a": [1, 2]}), "a.0"), None);
        assert_eq!(extract(&json!("root"), "a"), None);
    }

    #[test]
    fn extract_skips_empty_segments() {
        let value = json!({"a": {"b": 2}});
        assert_eq!(extract(&value, "a..b"), Some(&json!(2)));
    }

    #[test]
    fn entity_value_with_and_without_path() {
        let option = json!({"id": 7, "name": "Austria"});
        assert_eq!(entity_value(&option, Some("id")), json!(7));
        assert_eq!(entity_value(&option, None), option);
        assert_eq!(entity_value(&option, Some("missing")), Value::Null);
    }

    #[test]
    fn flatten_scalar_options() {
        let values = vec![json!("red"), json!(2), json!(true)];
        let options = flatten_options(&values, None, false);
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].label, "red");
        assert_eq!(options[0].value, json!("red"));
        assert_eq!(options[1].label, "2");
        assert_eq!(options[2].label, "true");
    }

    #[test]
    fn flatten_object_options_default_mapping() {
        let values = vec![json!({"label": "Austria", "value": "AT"})];
        let options = flatten_options(&values, None, false);
        assert_eq!(options[0].label, "Austria");
        assert_eq!(options[0].value, json!("AT"));
    }

    #[test]
    fn flatten_object_options_custom_mapping() {
        let mapping = OptionMapping {
            label: "name.common".into(),
            value: "cca2".into(),
        };
        let values = vec![json!({"name": {"common": "Austria"}, "cca2": "AT"})];
        let options = flatten_options(&values, Some(&mapping), false);
        assert_eq!(options[0].label, "Austria");
        assert_eq!(options[0].value, json!("AT"));
    }

    #[test]
    fn flatten_missing_value_path_keeps_whole_object() {
        let values = vec![json!({"label": "Raw", "payload": 1})];
        let options = flatten_options(&values, None, false);
        assert_eq!(options[0].label, "Raw");
        assert_eq!(options[0].value, json!({"label": "Raw", "payload": 1}));
    }

    #[test]
    fn flatten_reverse_flips_order() {
        let values = vec![json!(2020), json!(2021), json!(2022)];
        let options = flatten_options(&values, None, true);
        let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["2022", "2021", "2020"]);
    }
}
