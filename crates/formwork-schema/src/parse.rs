//! Boundary parsing of the raw JSON schema document into the typed AST.
//!
//! The document shape is `{sections, definition?, value?, context?}`. Parsing
//! is strict about what it accepts but never throws: malformed nodes degrade
//! to their neutral form (empty sections, no source, no condition) with a
//! warning, favoring render-something over crash.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use formwork_types::{
    Advanced, Bounds, ChangeEvent, Column, CompareRule, Condition, DataSource, Field, FieldKind,
    FieldSource, List, OptionMapping, Operator, SchemaDocument, SchemaNode, Section, StateToggle,
    ValidationSpec,
};

use crate::prepare::prepare;
use crate::resolver::DefinitionTable;

// --- Attribute extraction helpers ---

fn get_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(String::from)
}

fn get_bool(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn get_i64(map: &Map<String, Value>, key: &str) -> Option<i64> {
    map.get(key).and_then(Value::as_i64)
}

fn get_f64(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

fn get_object<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    map.get(key).and_then(Value::as_object)
}

fn get_array<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    map.get(key).and_then(Value::as_array)
}

// --- Document ---

/// Parse a raw schema document. Reference resolution and ordering happen here,
/// once, so the typed AST downstream is already resolved and sorted.
pub fn parse_document(raw: &Value) -> SchemaDocument {
    let Some(root) = raw.as_object() else {
        warn!("schema document is not an object, rendering nothing");
        return SchemaDocument::default();
    };

    let table = root
        .get("definition")
        .map(|d| DefinitionTable::new(d.clone()))
        .unwrap_or_default();

    let sections_raw = root.get("sections").cloned().unwrap_or(Value::Null);
    let sections = prepare(&sections_raw, &table)
        .iter()
        .filter_map(|s| parse_section(s, &table))
        .collect();

    SchemaDocument {
        sections,
        value: get_object(root, "value").cloned().unwrap_or_default(),
        // "env" is the legacy name for "context".
        context: get_object(root, "context")
            .or_else(|| get_object(root, "env"))
            .cloned()
            .unwrap_or_default(),
        translations: get_object(root, "translations").cloned().unwrap_or_default(),
        lang: get_str(root, "lang"),
    }
}

fn parse_section(raw: &Value, table: &DefinitionTable) -> Option<Section> {
    let map = raw.as_object().or_else(|| {
        warn!("section is not an object, skipping");
        None
    })?;

    let fields_raw = map.get("fields").cloned().unwrap_or(Value::Null);
    let fields = prepare(&fields_raw, table)
        .iter()
        .filter_map(parse_node)
        .collect();

    Some(Section {
        title: get_str(map, "title"),
        description: get_str(map, "description"),
        fields,
        order: get_f64(map, "order"),
        hidden: get_bool(map, "hidden"),
        separator: get_bool(map, "separator"),
    })
}

// --- Nodes ---

fn parse_node(raw: &Value) -> Option<SchemaNode> {
    let map = raw.as_object().or_else(|| {
        warn!("schema node is not an object, skipping");
        None
    })?;
    let type_name = get_str(map, "type").unwrap_or_default();

    match type_name.as_str() {
        "column" => Some(SchemaNode::Column(Column {
            fields: get_array(map, "fields")
                .map(|items| items.iter().filter_map(parse_field).collect())
                .unwrap_or_default(),
            advanced: parse_advanced(map),
        })),
        "list" => Some(SchemaNode::List(List {
            name: get_str(map, "name")?,
            fields: get_array(map, "fields")
                .map(|items| items.iter().filter_map(parse_node).collect())
                .unwrap_or_default(),
            advanced: parse_advanced(map),
        })),
        _ => parse_field(raw).map(SchemaNode::Field),
    }
}

fn parse_field(raw: &Value) -> Option<Field> {
    let map = raw.as_object()?;
    let Some(name) = get_str(map, "name") else {
        warn!("field without a name, skipping");
        return None;
    };
    let type_name = get_str(map, "type").unwrap_or_default();
    let validation = parse_validation(map);

    Some(Field {
        kind: FieldKind::from_type(&type_name),
        name,
        type_name,
        label: get_str(map, "label"),
        // A declared required message implies the field is required.
        required: get_bool(map, "required") || validation.required_message.is_some(),
        readonly: get_bool(map, "readonly"),
        hidden: get_bool(map, "hidden"),
        order: get_f64(map, "order"),
        validation,
        advanced: parse_advanced(map),
        events: parse_events(map),
        source: parse_source(map.get("source")),
    })
}

fn parse_source(raw: Option<&Value>) -> FieldSource {
    match raw {
        None | Some(Value::Null) => FieldSource::None,
        Some(Value::Array(items)) => FieldSource::Inline(items.clone()),
        Some(obj @ Value::Object(_)) => match parse_data_source(obj) {
            Some(source) => FieldSource::Remote(source),
            // Unresolved $ref stubs and malformed descriptors both land here:
            // the field simply renders without options.
            None => {
                debug!("field source is not a data source shape, ignoring");
                FieldSource::None
            }
        },
        Some(_) => FieldSource::None,
    }
}

/// Parse a DataSource shape. Anything without a string `url` is not a data
/// source (notably `{$ref}` stubs left by failed resolution).
pub fn parse_data_source(raw: &Value) -> Option<DataSource> {
    let map = raw.as_object()?;
    Some(DataSource {
        url: get_str(map, "url")?,
        method: get_str(map, "method"),
        body: map.get("body").cloned(),
        headers: get_object(map, "headers").cloned(),
        cache: map.get("cache").and_then(Value::as_bool),
        namespace: get_str(map, "namespace"),
    })
}

// --- Validation ---

fn parse_validation(map: &Map<String, Value>) -> ValidationSpec {
    let Some(validation) = get_object(map, "validation") else {
        return ValidationSpec::default();
    };

    ValidationSpec {
        required_message: get_str(validation, "required"),
        length: parse_bounds(get_object(validation, "length")),
        compare: parse_compare_rules(validation.get("compare")),
    }
}

fn parse_bounds(map: Option<&Map<String, Value>>) -> Bounds {
    match map {
        Some(map) => Bounds {
            min: get_i64(map, "min"),
            max: get_i64(map, "max"),
        },
        None => Bounds::default(),
    }
}

fn parse_compare_rules(raw: Option<&Value>) -> Vec<CompareRule> {
    let rules: Vec<&Value> = match raw {
        None => return Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    };

    rules
        .into_iter()
        .filter_map(|rule| {
            let map = rule.as_object()?;
            let field = get_str(map, "field")?;
            let op_name = get_str(map, "operator").unwrap_or_else(|| "eq".into());
            let Some(operator) = Operator::parse(&op_name) else {
                warn!(operator = %op_name, "unknown compare operator, dropping rule");
                return None;
            };
            Some(CompareRule {
                field,
                operator,
                message: get_str(map, "message").unwrap_or_default(),
            })
        })
        .collect()
}

// --- Advanced ---

fn parse_advanced(map: &Map<String, Value>) -> Advanced {
    let Some(advanced) = get_object(map, "advanced") else {
        return Advanced::default();
    };

    Advanced {
        entity: get_str(advanced, "entity"),
        autocomplete: get_str(advanced, "autocomplete"),
        length: parse_bounds(get_object(advanced, "length")),
        preselect: get_bool(advanced, "preselect"),
        orientation: get_str(advanced, "orientation"),
        reverse: get_bool(advanced, "reverse"),
        mapping: get_object(advanced, "mapping").and_then(|m| {
            Some(OptionMapping {
                label: get_str(m, "label")?,
                value: get_str(m, "value")?,
            })
        }),
        cols: get_i64(advanced, "cols").map(|c| c as u32),
    }
}

// --- Events ---

fn parse_events(map: &Map<String, Value>) -> Vec<ChangeEvent> {
    let Some(change) = get_object(map, "event").and_then(|e| get_array(e, "change")) else {
        return Vec::new();
    };
    change.iter().filter_map(parse_event).collect()
}

fn parse_event(raw: &Value) -> Option<ChangeEvent> {
    let map = raw.as_object()?;
    let action = get_str(map, "action")?;

    match action.as_str() {
        // "fetch" is the legacy name for "source".
        "source" | "fetch" => Some(ChangeEvent::Source {
            target: get_str(map, "target")?,
            source: map.get("source").and_then(|s| parse_data_source(s)),
        }),
        "value" => {
            let values = get_object(map, "value")?
                .iter()
                .map(|(target, template)| (target.clone(), template.clone()))
                .collect();
            Some(ChangeEvent::Value { values })
        }
        "state" => Some(ChangeEvent::State {
            target: get_str(map, "target")?,
            state: parse_state(get_object(map, "state")),
            when: map.get("when").and_then(parse_condition),
        }),
        other => {
            warn!(action = other, "unknown change event action, skipping");
            None
        }
    }
}

fn parse_state(map: Option<&Map<String, Value>>) -> StateToggle {
    match map {
        Some(map) => StateToggle {
            hidden: map.get("hidden").and_then(Value::as_bool),
            disabled: map.get("disabled").and_then(Value::as_bool),
        },
        None => StateToggle::default(),
    }
}

fn parse_condition(raw: &Value) -> Option<Condition> {
    match raw {
        Value::String(s) => Some(Condition::Value(s.clone())),
        Value::Array(items) => Some(Condition::AnyOf(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect(),
        )),
        Value::Object(map) => Some(Condition::Clause {
            field: get_str(map, "field"),
            operator: get_str(map, "operator"),
            value: map.get("value").cloned().unwrap_or(Value::Null),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(doc: Value) -> SchemaDocument {
        parse_document(&doc)
    }

    #[test]
    fn parses_sections_and_fields() {
        let doc = parse(json!({
            "sections": [{
                "title": "Personal",
                "fields": [
                    {"name": "email", "type": "input/email", "required": true},
                    {"name": "age", "type": "number"}
                ]
            }]
        }));

        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].title.as_deref(), Some("Personal"));
        let fields = doc.fields_by_name();
        assert_eq!(fields["email"].kind, FieldKind::Email);
        assert!(fields["email"].required);
        assert_eq!(fields["age"].kind, FieldKind::Number);
        assert!(!fields["age"].required);
    }

    #[test]
    fn non_object_document_degrades_to_empty() {
        assert_eq!(parse(json!([1, 2, 3])), SchemaDocument::default());
        assert_eq!(parse(json!("nope")), SchemaDocument::default());
    }

    #[test]
    fn sections_are_ordered() {
        let doc = parse(json!({
            "sections": [
                {"title": "B", "order": 2, "fields": []},
                {"title": "A", "order": 1, "fields": []},
                {"title": "C", "fields": []}
            ]
        }));
        let titles: Vec<_> = doc
            .sections
            .iter()
            .filter_map(|s| s.title.as_deref())
            .collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn field_source_ref_resolved_from_definition() {
        let doc = parse(json!({
            "definition": {
                "countries": {"url": "/api/countries", "namespace": "data"}
            },
            "sections": [{
                "fields": [{
                    "name": "country",
                    "type": "select",
                    "source": {"$ref": "#/definition/countries"}
                }]
            }]
        }));

        let fields = doc.fields_by_name();
        match &fields["country"].source {
            FieldSource::Remote(source) => {
                assert_eq!(source.url, "/api/countries");
                assert_eq!(source.namespace.as_deref(), Some("data"));
            }
            other => panic!("expected remote source, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_source_ref_means_no_source() {
        let doc = parse(json!({
            "sections": [{
                "fields": [{
                    "name": "country",
                    "type": "select",
                    "source": {"$ref": "#/definition/missing"}
                }]
            }]
        }));
        assert_eq!(
            doc.fields_by_name()["country"].source,
            FieldSource::None
        );
    }

    #[test]
    fn inline_source_array() {
        let doc = parse(json!({
            "sections": [{
                "fields": [{
                    "name": "color",
                    "type": "radio",
                    "source": ["red", "green"]
                }]
            }]
        }));
        match &doc.fields_by_name()["color"].source {
            FieldSource::Inline(items) => assert_eq!(items.len(), 2),
            other => panic!("expected inline source, got {other:?}"),
        }
    }

    #[test]
    fn columns_and_lists_parse() {
        let doc = parse(json!({
            "sections": [{
                "fields": [
                    {
                        "type": "column",
                        "advanced": {"cols": 2},
                        "fields": [
                            {"name": "first", "type": "input/text"},
                            {"name": "last", "type": "input/text"}
                        ]
                    },
                    {
                        "type": "list",
                        "name": "phones",
                        "advanced": {"length": {"min": 1, "max": 3}},
                        "fields": [{"name": "number", "type": "input/text"}]
                    }
                ]
            }]
        }));

        let section = &doc.sections[0];
        match &section.fields[0] {
            SchemaNode::Column(col) => {
                assert_eq!(col.advanced.cols, Some(2));
                assert_eq!(col.fields.len(), 2);
            }
            other => panic!("expected column, got {other:?}"),
        }
        match &section.fields[1] {
            SchemaNode::List(list) => {
                assert_eq!(list.name, "phones");
                assert_eq!(list.advanced.length.min, Some(1));
                assert_eq!(list.advanced.length.max, Some(3));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn change_events_parse_in_order() {
        let doc = parse(json!({
            "sections": [{
                "fields": [{
                    "name": "country",
                    "type": "select",
                    "event": {"change": [
                        {
                            "action": "source",
                            "target": "city",
                            "source": {"url": "/api/{id}/cities"}
                        },
                        {"action": "value", "value": {"zip": "{postal}"}},
                        {
                            "action": "state",
                            "target": "region",
                            "state": {"hidden": true},
                            "when": "US"
                        },
                        {"action": "unknown", "target": "x"}
                    ]}
                }]
            }]
        }));

        let events = &doc.fields_by_name()["country"].events;
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], ChangeEvent::Source { target, .. } if target == "city"));
        assert!(matches!(&events[1], ChangeEvent::Value { .. }));
        assert!(matches!(
            &events[2],
            ChangeEvent::State { when: Some(Condition::Value(v)), .. } if v == "US"
        ));
    }

    #[test]
    fn value_event_targets_keep_declaration_order() {
        // Targets declared in reverse-alphabetical order must not be resorted
        // by map iteration.
        let doc = parse(json!({
            "sections": [{
                "fields": [{
                    "name": "country",
                    "type": "select",
                    "event": {"change": [
                        {"action": "value", "value": {
                            "zip": "{postal}",
                            "city": "{capital}",
                            "area": "{region}"
                        }}
                    ]}
                }]
            }]
        }));

        let events = &doc.fields_by_name()["country"].events;
        let ChangeEvent::Value { values } = &events[0] else {
            panic!("expected value event, got {:?}", events[0]);
        };
        let targets: Vec<_> = values.iter().map(|(target, _)| target.as_str()).collect();
        assert_eq!(targets, vec!["zip", "city", "area"]);
    }

    #[test]
    fn legacy_fetch_action_parses_as_source() {
        let doc = parse(json!({
            "sections": [{
                "fields": [{
                    "name": "a",
                    "type": "select",
                    "event": {"change": [
                        {"action": "fetch", "target": "b", "source": {"url": "/b"}}
                    ]}
                }]
            }]
        }));
        assert!(matches!(
            &doc.fields_by_name()["a"].events[0],
            ChangeEvent::Source { .. }
        ));
    }

    #[test]
    fn validation_spec_parses() {
        let doc = parse(json!({
            "sections": [{
                "fields": [{
                    "name": "confirm",
                    "type": "input/text",
                    "validation": {
                        "required": "Please repeat the password",
                        "length": {"min": 8, "max": 64},
                        "compare": {
                            "field": "password",
                            "operator": "eq",
                            "message": "Passwords must match"
                        }
                    }
                }]
            }]
        }));

        let field = &doc.fields_by_name()["confirm"].clone();
        assert!(field.required);
        assert_eq!(
            field.validation.required_message.as_deref(),
            Some("Please repeat the password")
        );
        assert_eq!(field.validation.length.min, Some(8));
        assert_eq!(field.validation.compare.len(), 1);
        assert_eq!(field.validation.compare[0].operator, Operator::Eq);
    }

    #[test]
    fn unknown_compare_operator_drops_the_rule() {
        let doc = parse(json!({
            "sections": [{
                "fields": [{
                    "name": "a",
                    "type": "input/text",
                    "validation": {"compare": {"field": "b", "operator": "matches", "message": "m"}}
                }]
            }]
        }));
        assert!(doc.fields_by_name()["a"].validation.compare.is_empty());
    }

    #[test]
    fn initial_value_and_context_carried() {
        let doc = parse(json!({
            "sections": [],
            "value": {"email": "a@b.c"},
            "context": {"tier": "prod"},
            "translations": {"required": "Pflichtfeld"},
            "lang": "de"
        }));
        assert_eq!(doc.value["email"], json!("a@b.c"));
        assert_eq!(doc.context["tier"], json!("prod"));
        assert_eq!(doc.translations["required"], json!("Pflichtfeld"));
        assert_eq!(doc.lang.as_deref(), Some("de"));
    }

    #[test]
    fn legacy_env_key_feeds_context() {
        let doc = parse(json!({
            "sections": [],
            "env": {"region": "eu"}
        }));
        assert_eq!(doc.context["region"], json!("eu"));
    }
}
