//! Template interpolation of `{key}` placeholders against a value bag.
//!
//! Two flavors exist: a display flavor that substitutes verbatim (labels,
//! request bodies) and a URL flavor that percent-encodes substituted scalars
//! unless the replacement itself looks like a full URL. In both, only scalar
//! replacements substitute; a missing or non-scalar value leaves the
//! placeholder visible instead of rendering a hole.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::paths::extract;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^}]+)\}").unwrap())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Display,
    Url,
}

fn lookup<'a>(values: &'a Value, key: &str) -> Option<&'a Value> {
    if key.contains('.') {
        extract(values, key)
    } else {
        values.as_object().and_then(|map| map.get(key))
    }
}

fn scalar_replacement(value: &Value, flavor: Flavor) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    match flavor {
        Flavor::Display => Some(raw),
        // Full URLs pass through unencoded so a substituted base URL keeps
        // its scheme and slashes intact.
        Flavor::Url if raw.contains("://") => Some(raw),
        Flavor::Url => Some(urlencoding::encode(&raw).into_owned()),
    }
}

fn interpolate_str(template: &str, values: &Value, flavor: Flavor) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            match lookup(values, key).and_then(|v| scalar_replacement(v, flavor)) {
                Some(replacement) => replacement,
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn interpolate_value(template: &Value, values: &Value, flavor: Flavor) -> Value {
    match template {
        Value::String(s) => Value::String(interpolate_str(s, values, flavor)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_value(item, values, flavor))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, values, flavor)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Substitute `{key}` placeholders without any encoding. Used for labels,
/// literal value events, and request bodies.
pub fn interpolate_for_display(template: &Value, values: &Value) -> Value {
    interpolate_value(template, values, Flavor::Display)
}

/// Substitute `{key}` placeholders, percent-encoding each substituted scalar
/// unless it contains `://`. Used when building request URLs.
pub fn interpolate_for_url(template: &str, values: &Value) -> String {
    interpolate_str(template, values, Flavor::Url)
}

/// True if the template still contains any `{...}` placeholder, recursively
/// through arrays and object values. Used to hold back a fetch until its URL
/// is fully resolvable.
pub fn is_interpolated(template: &Value) -> bool {
    match template {
        Value::String(s) => placeholder_re().is_match(s),
        Value::Array(items) => items.iter().any(is_interpolated),
        Value::Object(map) => map.values().any(is_interpolated),
        _ => false,
    }
}
