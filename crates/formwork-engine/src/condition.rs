//! Condition evaluation and the shared operator table.
//!
//! The same operator table backs state-event conditions and cross-field
//! compare validation rules. Unknown operators evaluate to false, never to an
//! error: a misdeclared condition must not break the form.

use serde_json::Value;

use formwork_schema::extract;
use formwork_types::{Condition, Operator};

static NULL: Value = Value::Null;

/// Stringify a scalar the way option values are compared: numbers and booleans
/// by their display form, null and non-scalars as the empty string.
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Apply an operator to a current value and an expected value.
///
/// `eq`/`neq` use strict JSON equality. `in`/`nin` test membership of the
/// stringified current value in an expected array (a non-array right side is
/// unsatisfiable for both). The numeric comparisons coerce both sides and are
/// false when either side is not numeric.
pub fn apply_operator(operator: Operator, current: &Value, expected: &Value) -> bool {
    match operator {
        Operator::Eq => current == expected,
        Operator::Neq => current != expected,
        Operator::In | Operator::Nin => {
            let Value::Array(items) = expected else {
                return false;
            };
            let needle = scalar_string(current);
            let found = items.iter().any(|item| scalar_string(item) == needle);
            match operator {
                Operator::In => found,
                _ => !found,
            }
        }
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let (Some(a), Some(b)) = (as_number(current), as_number(expected)) else {
                return false;
            };
            match operator {
                Operator::Gt => a > b,
                Operator::Gte => a >= b,
                Operator::Lt => a < b,
                _ => a <= b,
            }
        }
    }
}

/// Pick the value a condition inspects out of the selected record.
///
/// Object selections are walked at `field` (default path `"value"`); a scalar
/// selection stands for itself when no explicit field is named.
fn current_value<'a>(selected: &'a Value, field: Option<&str>) -> &'a Value {
    match selected {
        Value::Object(_) => extract(selected, field.unwrap_or("value")).unwrap_or(&NULL),
        _ if field.is_none() => selected,
        _ => &NULL,
    }
}

/// Evaluate a state-event condition against the selected value.
///
/// No condition is always true. String and array shorthands compare the
/// stringified current value; the clause form applies the operator table with
/// `eq` as the default operator.
pub fn evaluate_condition(selected: &Value, when: Option<&Condition>) -> bool {
    let Some(when) = when else {
        return true;
    };

    match when {
        Condition::Value(expected) => {
            scalar_string(current_value(selected, None)) == *expected
        }
        Condition::AnyOf(expected) => {
            let current = scalar_string(current_value(selected, None));
            expected.iter().any(|item| *item == current)
        }
        Condition::Clause {
            field,
            operator,
            value,
        } => {
            let operator = match operator.as_deref() {
                None => Operator::Eq,
                Some(name) => match Operator::parse(name) {
                    Some(op) => op,
                    None => return false,
                },
            };
            let current = current_value(selected, field.as_deref());
            apply_operator(operator, current, value)
        }
    }
}
