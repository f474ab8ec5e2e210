//! Shared types, schema AST, events, and errors for the formwork engine.
//!
//! This crate provides the foundational types used across all other formwork
//! crates:
//! - `FormworkError` — unified error taxonomy
//! - `Section` / `SchemaNode` / `Field` — the typed schema AST
//! - `ChangeEvent` / `Effect` — the reactive event vocabulary
//! - `DataSource` / `RemotePattern` — declarative request descriptors

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unified error type for all formwork subsystems.
#[derive(Debug, thiserror::Error)]
pub enum FormworkError {
    // === Schema Errors ===
    #[error("Schema error at {path}: {message}")]
    SchemaError { path: String, message: String },

    // === Fetch Errors ===
    #[error("Request to {url} returned HTTP {status}")]
    FetchStatus {
        url: String,
        status: u16,
        /// Parsed response body, surfaced as the error payload.
        body: serde_json::Value,
    },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("URL '{url}' is not allowed by the remote pattern list")]
    BlockedUrl { url: String },

    #[error("URL '{url}' contains unresolved placeholders")]
    UnresolvedUrl { url: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    // === Serialization ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FormworkError>;

// ---------------------------------------------------------------------------
// FieldKind — closed taxonomy of field types
// ---------------------------------------------------------------------------

/// The closed set of field kinds, determined once when the schema document is
/// parsed. All downstream dispatch (validation, option flattening) matches
/// exhaustively on this enum instead of re-inspecting the raw `type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Email,
    Checkbox,
    Radio,
    Select,
    SelectMonth,
    SelectYear,
}

impl FieldKind {
    /// Map a raw dotted `type` string (e.g. `"input/email"`, `"select/year"`)
    /// to a kind. Unrecognized types fall back to generic text, mirroring the
    /// renderer's default input.
    pub fn from_type(type_name: &str) -> FieldKind {
        let name = type_name.trim();
        match name {
            "select/year" => FieldKind::SelectYear,
            "select/month" => FieldKind::SelectMonth,
            _ if name.starts_with("select") => FieldKind::Select,
            "radio" => FieldKind::Radio,
            "checkbox" => FieldKind::Checkbox,
            "textarea" => FieldKind::Textarea,
            "number" | "input/number" => FieldKind::Number,
            "email" | "input/email" => FieldKind::Email,
            _ => FieldKind::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Operator — shared comparison vocabulary
// ---------------------------------------------------------------------------

/// Comparison operator used by both state-event conditions and cross-field
/// compare validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Neq,
    In,
    Nin,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Parse an operator name. Unknown names yield `None`; callers treat an
    /// unknown operator as an always-false condition.
    pub fn parse(name: &str) -> Option<Operator> {
        match name {
            "eq" => Some(Operator::Eq),
            "neq" => Some(Operator::Neq),
            "in" => Some(Operator::In),
            "nin" => Some(Operator::Nin),
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DataSource — declarative request descriptor
// ---------------------------------------------------------------------------

/// A declarative HTTP request descriptor attached to a field or emitted by a
/// source event. `namespace` is a dot-path into the JSON response selecting
/// the array of options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl DataSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: None,
            body: None,
            headers: None,
            cache: None,
            namespace: None,
        }
    }
}

/// One entry of the remote allowlist. Omitted sub-fields match anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RemotePattern {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

// ---------------------------------------------------------------------------
// Conditions and change events
// ---------------------------------------------------------------------------

/// Condition attached to a state event. A bare string or array is shorthand
/// for equality/membership against the current value; the clause form extracts
/// a dot-path from the selected record and applies an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Value(String),
    AnyOf(Vec<String>),
    Clause {
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
        value: serde_json::Value,
    },
}

/// Visibility/enablement toggles applied by a state event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StateToggle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// An event declared under `event.change` on a field, fired when the field's
/// value changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Set a new data source on `target`. `source` is `None` when the declared
    /// source did not parse as a DataSource shape (including unresolved refs);
    /// such events produce no effect on a non-null selection.
    Source {
        target: String,
        source: Option<DataSource>,
    },
    /// Set literal interpolated values on one or more targets, in declaration
    /// order.
    Value {
        values: Vec<(String, serde_json::Value)>,
    },
    /// Conditionally toggle hidden/disabled state on `target`.
    State {
        target: String,
        state: StateToggle,
        when: Option<Condition>,
    },
}

// ---------------------------------------------------------------------------
// Effect — the output of the event pipeline
// ---------------------------------------------------------------------------

/// One computed ripple effect of a value change. Handlers return ordered
/// effect lists; the rendering layer applies them. A `None` payload is an
/// explicit clear, reverting any previously applied override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Source {
        target: String,
        source: Option<DataSource>,
    },
    Value {
        target: String,
        value: Option<serde_json::Value>,
    },
    State {
        target: String,
        state: Option<StateToggle>,
    },
}

impl Effect {
    pub fn target(&self) -> &str {
        match self {
            Effect::Source { target, .. }
            | Effect::Value { target, .. }
            | Effect::State { target, .. } => target,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation declarations
// ---------------------------------------------------------------------------

/// Inclusive numeric/length bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Bounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

/// A cross-field comparison rule: the declaring field's value must satisfy
/// `operator` against the named sibling field's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRule {
    pub field: String,
    pub operator: Operator,
    pub message: String,
}

/// Validation declarations attached to a field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationSpec {
    /// Message shown when a required field is empty.
    pub required_message: Option<String>,
    pub length: Bounds,
    pub compare: Vec<CompareRule>,
}

// ---------------------------------------------------------------------------
// Advanced — type-specific field options
// ---------------------------------------------------------------------------

/// Mapping from option objects to label/value pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMapping {
    pub label: String,
    pub value: String,
}

/// One flattened option: a display label and the underlying value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPair {
    pub label: String,
    pub value: serde_json::Value,
}

/// Type-specific field options (`advanced` in the schema document).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Advanced {
    /// Sub-property of a selected option object used as its canonical value.
    pub entity: Option<String>,
    pub autocomplete: Option<String>,
    pub length: Bounds,
    pub preselect: bool,
    pub orientation: Option<String>,
    pub reverse: bool,
    pub mapping: Option<OptionMapping>,
    pub cols: Option<u32>,
}

// ---------------------------------------------------------------------------
// Schema AST
// ---------------------------------------------------------------------------

/// Where a field's options come from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldSource {
    #[default]
    None,
    /// Inline option array from the schema document.
    Inline(Vec<serde_json::Value>),
    /// Remote options described by a DataSource.
    Remote(DataSource),
}

/// A leaf schema node: one form input.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// The raw dotted type string from the document, kept for diagnostics.
    pub type_name: String,
    pub kind: FieldKind,
    pub label: Option<String>,
    pub required: bool,
    pub readonly: bool,
    pub hidden: bool,
    pub order: Option<f64>,
    pub validation: ValidationSpec,
    pub advanced: Advanced,
    pub events: Vec<ChangeEvent>,
    pub source: FieldSource,
}

/// A layout grouping of fields rendered side by side. Does not affect
/// validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub fields: Vec<Field>,
    pub advanced: Advanced,
}

/// A repeatable group of fields; each repetition is addressed by a 0-based
/// instance id.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub name: String,
    pub fields: Vec<SchemaNode>,
    pub advanced: Advanced,
}

/// Discriminated union of nodes appearing under a section.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Field(Field),
    Column(Column),
    List(List),
}

impl SchemaNode {
    /// Iterate over every leaf field in this node, columns and lists included.
    pub fn fields(&self) -> Vec<&Field> {
        match self {
            SchemaNode::Field(f) => vec![f],
            SchemaNode::Column(c) => c.fields.iter().collect(),
            SchemaNode::List(l) => l.fields.iter().flat_map(|n| n.fields()).collect(),
        }
    }
}

/// Top-level grouping of schema nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<SchemaNode>,
    pub order: Option<f64>,
    pub hidden: bool,
    pub separator: bool,
}

/// A parsed schema document: ordered sections plus the auxiliary maps that
/// ride along with them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaDocument {
    pub sections: Vec<Section>,
    /// Initial form values.
    pub value: serde_json::Map<String, serde_json::Value>,
    /// Interpolation sources for labels, independent of form values.
    pub context: serde_json::Map<String, serde_json::Value>,
    /// Translation strings keyed by message id, carried for the renderer.
    pub translations: serde_json::Map<String, serde_json::Value>,
    pub lang: Option<String>,
}

impl SchemaDocument {
    /// Every leaf field across all sections, keyed by name. Later duplicates
    /// (which violate the uniqueness invariant) overwrite earlier ones.
    pub fn fields_by_name(&self) -> HashMap<&str, &Field> {
        let mut map = HashMap::new();
        for section in &self.sections {
            for node in &section.fields {
                for field in node.fields() {
                    map.insert(field.name.as_str(), field);
                }
            }
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Orderable — stable sort placement
// ---------------------------------------------------------------------------

/// Any node carrying an optional `order` for stable sort placement. Orders
/// may be fractional; nodes without one sort last, keeping their original
/// relative order.
pub trait Orderable {
    fn order(&self) -> Option<f64>;
}

impl Orderable for Section {
    fn order(&self) -> Option<f64> {
        self.order
    }
}

impl Orderable for Field {
    fn order(&self) -> Option<f64> {
        self.order
    }
}

impl Orderable for SchemaNode {
    fn order(&self) -> Option<f64> {
        match self {
            SchemaNode::Field(f) => f.order,
            SchemaNode::Column(_) | SchemaNode::List(_) => None,
        }
    }
}

/// Stable sort by `order` ascending; missing order sorts as +infinity.
pub fn sort_by_order<T: Orderable>(nodes: &mut [T]) {
    nodes.sort_by(|a, b| {
        a.order()
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.order().unwrap_or(f64::INFINITY))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_kind_from_dotted_types() {
        assert_eq!(FieldKind::from_type("input/email"), FieldKind::Email);
        assert_eq!(FieldKind::from_type("email"), FieldKind::Email);
        assert_eq!(FieldKind::from_type("select/year"), FieldKind::SelectYear);
        assert_eq!(FieldKind::from_type("select/month"), FieldKind::SelectMonth);
        assert_eq!(FieldKind::from_type("select"), FieldKind::Select);
        assert_eq!(FieldKind::from_type("select/country"), FieldKind::Select);
        assert_eq!(FieldKind::from_type("radio"), FieldKind::Radio);
        assert_eq!(FieldKind::from_type("checkbox"), FieldKind::Checkbox);
        assert_eq!(FieldKind::from_type("number"), FieldKind::Number);
        assert_eq!(FieldKind::from_type("textarea"), FieldKind::Textarea);
    }

    #[test]
    fn unknown_type_falls_back_to_text() {
        assert_eq!(FieldKind::from_type("input/phone"), FieldKind::Text);
        assert_eq!(FieldKind::from_type(""), FieldKind::Text);
    }

    #[test]
    fn operator_parse_known_and_unknown() {
        assert_eq!(Operator::parse("eq"), Some(Operator::Eq));
        assert_eq!(Operator::parse("nin"), Some(Operator::Nin));
        assert_eq!(Operator::parse("gte"), Some(Operator::Gte));
        assert_eq!(Operator::parse("contains"), None);
    }

    struct N(Option<f64>, &'static str);
    impl Orderable for N {
        fn order(&self) -> Option<f64> {
            self.0
        }
    }

    #[test]
    fn sort_by_order_missing_order_goes_last() {
        let mut nodes = vec![
            N(Some(2.0), "b"),
            N(Some(1.0), "a"),
            N(None, "x"),
            N(Some(0.0), "z"),
        ];
        sort_by_order(&mut nodes);
        let names: Vec<_> = nodes.iter().map(|n| n.1).collect();
        assert_eq!(names, vec!["z", "a", "b", "x"]);
    }

    #[test]
    fn sort_by_order_is_stable_among_unordered() {
        let mut nodes = vec![N(None, "first"), N(Some(5.0), "mid"), N(None, "second")];
        sort_by_order(&mut nodes);
        let names: Vec<_> = nodes.iter().map(|n| n.1).collect();
        assert_eq!(names, vec!["mid", "first", "second"]);
    }

    #[test]
    fn sort_by_order_places_fractional_orders() {
        let mut nodes = vec![N(Some(2.0), "c"), N(Some(1.5), "b"), N(Some(1.0), "a")];
        sort_by_order(&mut nodes);
        let names: Vec<_> = nodes.iter().map(|n| n.1).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn error_display_fetch_status() {
        let err = FormworkError::FetchStatus {
            url: "https://api.example.com/items".into(),
            status: 404,
            body: serde_json::json!({"message": "not found"}),
        };
        assert_eq!(
            err.to_string(),
            "Request to https://api.example.com/items returned HTTP 404"
        );
    }

    #[test]
    fn error_display_blocked_url() {
        let err = FormworkError::BlockedUrl {
            url: "https://evil.example.com".into(),
        };
        assert_eq!(
            err.to_string(),
            "URL 'https://evil.example.com' is not allowed by the remote pattern list"
        );
    }

    #[test]
    fn effect_target_accessor() {
        let e = Effect::Value {
            target: "city".into(),
            value: Some(serde_json::json!("NYC")),
        };
        assert_eq!(e.target(), "city");
    }

    #[test]
    fn effect_serialization_round_trip() {
        let effect = Effect::State {
            target: "company".into(),
            state: Some(StateToggle {
                hidden: Some(true),
                disabled: None,
            }),
        };
        let json = serde_json::to_string(&effect).unwrap();
        let back: Effect = serde_json::from_str(&json).unwrap();
        assert_eq!(back, effect);
    }

    #[test]
    fn schema_node_fields_flattens_columns_and_lists() {
        let field = |name: &str| Field {
            name: name.into(),
            type_name: "input/text".into(),
            kind: FieldKind::Text,
            label: None,
            required: false,
            readonly: false,
            hidden: false,
            order: None,
            validation: ValidationSpec::default(),
            advanced: Advanced::default(),
            events: Vec::new(),
            source: FieldSource::None,
        };

        let node = SchemaNode::List(List {
            name: "phones".into(),
            fields: vec![
                SchemaNode::Column(Column {
                    fields: vec![field("kind"), field("number")],
                    advanced: Advanced::default(),
                }),
                SchemaNode::Field(field("note")),
            ],
            advanced: Advanced::default(),
        });

        let names: Vec<_> = node.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["kind", "number", "note"]);
    }
}
