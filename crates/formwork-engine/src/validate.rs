//! Validation synthesis: per-field validators generated from field
//! declarations, assembled into an object validator with cross-field compare
//! rules on top.
//!
//! Validation is a two-stage pipeline per field: an explicit normalization
//! step (required-but-null short-circuits straight to the required message,
//! bypassing coercion errors) followed by type coercion and rule checks.
//! Nothing about invalid input is ever thrown past this boundary; failures
//! always recover into the flat `field -> messages` shape.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use formwork_types::{Bounds, CompareRule, Field, FieldKind};

use crate::condition::apply_operator;

static NULL: Value = Value::Null;

const DEFAULT_REQUIRED: &str = "This field is required";
const INVALID_TEXT: &str = "Expected text";
const INVALID_NUMBER: &str = "Expected a number";
const INVALID_EMAIL: &str = "Invalid email address";
const INVALID_MONTH: &str = "Month must be between 1 and 12";

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// One validation failure, keyed to the failing field's path.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub path: Vec<String>,
    pub message: String,
}

/// Structured validation failure for a whole form value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

/// Convert a structured failure into per-field ordered message lists. Issues
/// without a path land under the empty key.
pub fn flatten(error: &ValidationError) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for issue in &error.issues {
        let key = issue.path.first().cloned().unwrap_or_default();
        map.entry(key).or_default().push(issue.message.clone());
    }
    map
}

// ---------------------------------------------------------------------------
// FieldValidator
// ---------------------------------------------------------------------------

/// A runtime validator for one field, synthesized from its declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValidator {
    kind: FieldKind,
    required: bool,
    required_message: String,
    length: Bounds,
}

/// Synthesize a validator from a field declaration. Dispatch is on the field
/// kind resolved at schema load; the declared required message wins over the
/// generic one.
pub fn get_schema(field: &Field) -> FieldValidator {
    FieldValidator {
        kind: field.kind,
        required: field.required,
        required_message: field
            .validation
            .required_message
            .clone()
            .unwrap_or_else(|| DEFAULT_REQUIRED.to_string()),
        length: field.validation.length,
    }
}

fn coerce_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(INVALID_TEXT.to_string()),
    }
}

fn coerce_integer(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| INVALID_NUMBER.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .map_err(|_| INVALID_NUMBER.to_string())
        }
        _ => Err(INVALID_NUMBER.to_string()),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Null or whitespace-only input counts as missing before any coercion runs.
fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl FieldValidator {
    /// Validate one raw input value. Success yields the normalized value that
    /// participates in cross-field comparison; failure yields the ordered
    /// message list for this field.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<String>> {
        match self.kind {
            FieldKind::Number | FieldKind::SelectYear => self.validate_integer(value, None),
            FieldKind::SelectMonth => self.validate_integer(value, Some((1, 12))),
            FieldKind::Email => self.validate_email(value),
            FieldKind::Checkbox => self.validate_checkbox(value),
            FieldKind::Radio => self.validate_radio(value),
            FieldKind::Text | FieldKind::Textarea | FieldKind::Select => {
                self.validate_text(value)
            }
        }
    }

    fn validate_text(&self, value: &Value) -> Result<Value, Vec<String>> {
        let text = coerce_string(value).map_err(|m| vec![m])?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return if self.required {
                Err(vec![self.required_message.clone()])
            } else {
                Ok(Value::String(text))
            };
        }

        let mut errors = Vec::new();
        let chars = text.chars().count() as i64;
        if let Some(min) = self.length.min {
            if chars < min {
                errors.push(format!("Must be at least {min} characters"));
            }
        }
        if let Some(max) = self.length.max {
            if chars > max {
                errors.push(format!("Must be at most {max} characters"));
            }
        }
        if errors.is_empty() {
            Ok(Value::String(text))
        } else {
            Err(errors)
        }
    }

    fn validate_integer(
        &self,
        value: &Value,
        range: Option<(i64, i64)>,
    ) -> Result<Value, Vec<String>> {
        // Required-but-missing fires the required message, never a coercion
        // error; optional-and-missing normalizes to null.
        if is_missing(value) {
            return if self.required {
                Err(vec![self.required_message.clone()])
            } else {
                Ok(Value::Null)
            };
        }

        let n = coerce_integer(value).map_err(|m| vec![m])?;

        // The month window applies regardless of required-ness.
        if let Some((lo, hi)) = range {
            if n < lo || n > hi {
                return Err(vec![INVALID_MONTH.to_string()]);
            }
            return Ok(Value::from(n));
        }

        let mut errors = Vec::new();
        if let Some(min) = self.length.min {
            if n < min {
                errors.push(format!("Must be at least {min}"));
            }
        }
        if let Some(max) = self.length.max {
            if n > max {
                errors.push(format!("Must be at most {max}"));
            }
        }
        if errors.is_empty() {
            Ok(Value::from(n))
        } else {
            Err(errors)
        }
    }

    fn validate_email(&self, value: &Value) -> Result<Value, Vec<String>> {
        let text = coerce_string(value).map_err(|m| vec![m])?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return if self.required {
                Err(vec![self.required_message.clone()])
            } else {
                Ok(Value::String(text))
            };
        }
        if !email_re().is_match(&text) {
            return Err(vec![INVALID_EMAIL.to_string()]);
        }
        Ok(Value::String(text))
    }

    fn validate_checkbox(&self, value: &Value) -> Result<Value, Vec<String>> {
        // Null normalizes to false first, so unchecked-and-required always
        // fails with the declared message.
        let checked = truthy(value);
        if self.required && !checked {
            return Err(vec![self.required_message.clone()]);
        }
        Ok(Value::Bool(checked))
    }

    fn validate_radio(&self, value: &Value) -> Result<Value, Vec<String>> {
        let text = coerce_string(value).map_err(|m| vec![m])?;
        if self.required && text.is_empty() {
            return Err(vec![self.required_message.clone()]);
        }
        Ok(Value::String(text))
    }
}

// ---------------------------------------------------------------------------
// FormValidator
// ---------------------------------------------------------------------------

/// Composite object validator: per-field validators plus cross-field compare
/// rules layered on top. Compare rules run only after every base check has
/// passed, against the normalized values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormValidator {
    fields: Vec<(String, FieldValidator)>,
    compare: Vec<(String, CompareRule)>,
}

/// Assemble an object validator from per-field validators, in iteration
/// order.
pub fn build_schema(fields: impl IntoIterator<Item = (String, FieldValidator)>) -> FormValidator {
    FormValidator {
        fields: fields.into_iter().collect(),
        compare: Vec::new(),
    }
}

/// Layer cross-field compare rules from the given field declarations onto an
/// assembled validator.
pub fn apply_compare_validation<'a>(
    mut schema: FormValidator,
    fields: impl IntoIterator<Item = &'a Field>,
) -> FormValidator {
    for field in fields {
        for rule in &field.validation.compare {
            schema.compare.push((field.name.clone(), rule.clone()));
        }
    }
    schema
}

impl FormValidator {
    /// Validate a whole form value object, returning the normalized values or
    /// the structured failure.
    pub fn validate(
        &self,
        values: &Value,
    ) -> Result<serde_json::Map<String, Value>, ValidationError> {
        static EMPTY: OnceLock<serde_json::Map<String, Value>> = OnceLock::new();
        let obj = values
            .as_object()
            .unwrap_or_else(|| EMPTY.get_or_init(serde_json::Map::new));

        let mut out = serde_json::Map::new();
        let mut issues = Vec::new();
        for (name, validator) in &self.fields {
            let raw = obj.get(name).unwrap_or(&NULL);
            match validator.validate(raw) {
                Ok(normalized) => {
                    out.insert(name.clone(), normalized);
                }
                Err(messages) => issues.extend(messages.into_iter().map(|message| Issue {
                    path: vec![name.clone()],
                    message,
                })),
            }
        }
        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        for (name, rule) in &self.compare {
            let current = out.get(name).unwrap_or(&NULL);
            let other = out.get(&rule.field).unwrap_or(&NULL);
            if !apply_operator(rule.operator, current, other) {
                issues.push(Issue {
                    path: vec![name.clone()],
                    message: rule.message.clone(),
                });
            }
        }
        if issues.is_empty() {
            Ok(out)
        } else {
            Err(ValidationError { issues })
        }
    }
}
