//! The preparer: reference-resolve then stable-sort a list of schema nodes.

use serde_json::Value;
use tracing::warn;

use crate::resolver::{resolve_refs, DefinitionTable};

/// Resolve refs across `nodes` and stably sort the result by `order`
/// ascending. Nodes without an `order` sort last, keeping their original
/// relative order. A resolution result that is not an array degrades to an
/// empty vec rather than failing the render.
pub fn prepare(nodes: &Value, table: &DefinitionTable) -> Vec<Value> {
    let resolved = resolve_refs(nodes, table);
    let mut items = match resolved {
        Value::Array(items) => items,
        other => {
            warn!(
                kind = json_kind(&other),
                "prepare expected an array of nodes, rendering nothing"
            );
            return Vec::new();
        }
    };

    items.sort_by(|a, b| order_key(a).total_cmp(&order_key(b)));
    items
}

// Orders may be fractional; missing sorts as +infinity.
fn order_key(node: &Value) -> f64 {
    node.get("order")
        .and_then(Value::as_f64)
        .unwrap_or(f64::INFINITY)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_by_order_with_missing_last() {
        let nodes = json!([
            {"order": 2},
            {"order": 1},
            {"name": "unordered"},
            {"order": 0}
        ]);
        let prepared = prepare(&nodes, &DefinitionTable::empty());
        assert_eq!(
            prepared,
            vec![
                json!({"order": 0}),
                json!({"order": 1}),
                json!({"order": 2}),
                json!({"name": "unordered"})
            ]
        );
    }

    #[test]
    fn stable_among_equal_orders() {
        let nodes = json!([
            {"order": 1, "name": "a"},
            {"order": 1, "name": "b"},
            {"name": "c"},
            {"name": "d"}
        ]);
        let prepared = prepare(&nodes, &DefinitionTable::empty());
        let names: Vec<_> = prepared
            .iter()
            .map(|n| n["name"].as_str().unwrap_or(""))
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn fractional_orders_place_between_integers() {
        let nodes = json!([
            {"name": "c", "order": 2},
            {"name": "b", "order": 1.5},
            {"name": "a", "order": 1}
        ]);
        let prepared = prepare(&nodes, &DefinitionTable::empty());
        let names: Vec<_> = prepared
            .iter()
            .map(|n| n["name"].as_str().unwrap_or(""))
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn resolves_refs_before_sorting() {
        let table = DefinitionTable::new(json!({
            "first": {"name": "first", "order": 0}
        }));
        let nodes = json!([
            {"name": "second", "order": 5},
            {"$ref": "#/definition/first"}
        ]);
        let prepared = prepare(&nodes, &table);
        assert_eq!(prepared[0]["name"], json!("first"));
        assert_eq!(prepared[1]["name"], json!("second"));
    }

    #[test]
    fn non_array_degrades_to_empty() {
        assert!(prepare(&json!({"not": "an array"}), &DefinitionTable::empty()).is_empty());
        assert!(prepare(&json!("scalar"), &DefinitionTable::empty()).is_empty());
        assert!(prepare(&Value::Null, &DefinitionTable::empty()).is_empty());
    }
}
