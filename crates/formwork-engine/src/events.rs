//! The change event pipeline.
//!
//! Given the newly committed value of a field and its declared change events,
//! each handler computes the ripple effects on dependent fields as an ordered
//! [`Effect`] list. A null selection clears downstream effects. Handlers are
//! stateless transforms; the rendering layer applies the effects and merges
//! concurrent contributions (see [`crate::merge_source`]).

use serde_json::Value;

use formwork_schema::{interpolate_for_display, interpolate_for_url};
use formwork_types::{ChangeEvent, DataSource, Effect};

use crate::condition::evaluate_condition;

/// Interpolate a data source's url and body against the selected value.
fn interpolate_source(source: &DataSource, selected: &Value) -> DataSource {
    let mut out = source.clone();
    out.url = interpolate_for_url(&source.url, selected);
    if let Some(body) = &source.body {
        out.body = Some(interpolate_for_display(body, selected));
    }
    out
}

/// Handle `source`/`fetch` events: each one re-points its target's dynamic
/// data source. A null selection clears the target's dynamic source (falling
/// back to its static source, if any); an event whose declared source did not
/// parse as a DataSource shape produces no effect.
pub fn handle_source_event(selected: &Value, events: &[ChangeEvent]) -> Vec<Effect> {
    let mut effects = Vec::new();
    for event in events {
        let ChangeEvent::Source { target, source } = event else {
            continue;
        };
        if selected.is_null() {
            effects.push(Effect::Source {
                target: target.clone(),
                source: None,
            });
        } else if let Some(source) = source {
            effects.push(Effect::Source {
                target: target.clone(),
                source: Some(interpolate_source(source, selected)),
            });
        } else {
            tracing::debug!(target = %target, "source event without a data source shape, skipping");
        }
    }
    effects
}

/// Handle `value` events: set literal interpolated values on each target, or
/// clear them all on a null selection.
pub fn handle_value_event(selected: &Value, events: &[ChangeEvent]) -> Vec<Effect> {
    let mut effects = Vec::new();
    for event in events {
        let ChangeEvent::Value { values } = event else {
            continue;
        };
        for (target, template) in values {
            let value = if selected.is_null() {
                None
            } else {
                Some(interpolate_for_display(template, selected))
            };
            effects.push(Effect::Value {
                target: target.clone(),
                value,
            });
        }
    }
    effects
}

/// Handle `state` events: the declared state applies only while the condition
/// holds, and is explicitly cleared (not merely left unset) when it stops
/// holding, so a previous hidden/disabled override reverts.
pub fn handle_state_event(selected: &Value, events: &[ChangeEvent]) -> Vec<Effect> {
    let mut effects = Vec::new();
    for event in events {
        let ChangeEvent::State {
            target,
            state,
            when,
        } = event
        else {
            continue;
        };
        let matches = !selected.is_null() && evaluate_condition(selected, when.as_ref());
        effects.push(Effect::State {
            target: target.clone(),
            state: matches.then_some(*state),
        });
    }
    effects
}

/// Source and value effects of one change, partitioned for batch application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectBatch {
    pub sources: Vec<Effect>,
    pub values: Vec<Effect>,
}

/// Partition a raw event list into source and value effect buckets, each in
/// declaration order, so the rendering layer can apply all effects of one
/// value change atomically.
pub fn handle_proxy_event(selected: &Value, events: &[ChangeEvent]) -> EffectBatch {
    EffectBatch {
        sources: handle_source_event(selected, events),
        values: handle_value_event(selected, events),
    }
}

/// Run the full pipeline over one event list, preserving declaration order
/// across all event kinds.
pub fn handle_change_event(selected: &Value, events: &[ChangeEvent]) -> Vec<Effect> {
    let mut effects = Vec::new();
    for event in events {
        let single = std::slice::from_ref(event);
        match event {
            ChangeEvent::Source { .. } => effects.extend(handle_source_event(selected, single)),
            ChangeEvent::Value { .. } => effects.extend(handle_value_event(selected, single)),
            ChangeEvent::State { .. } => effects.extend(handle_state_event(selected, single)),
        }
    }
    effects
}
