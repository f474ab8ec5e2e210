//! Reactive form engine: change event pipeline, condition evaluation, source
//! merging, and validation synthesis.
//!
//! This crate implements the cross-field machinery of formwork: the handlers
//! that turn one field's value change into ordered effect lists for dependent
//! fields, the operator table shared by state conditions and compare
//! validation, the fold that merges partial data-source contributions, and
//! the synthesizer that turns field declarations into runtime validators.

pub mod condition;
pub mod events;
pub mod source;
pub mod validate;

pub use condition::{apply_operator, evaluate_condition, scalar_string};
pub use events::{
    handle_change_event, handle_proxy_event, handle_source_event, handle_state_event,
    handle_value_event, EffectBatch,
};
pub use source::merge_source;
pub use validate::{
    apply_compare_validation, build_schema, flatten, get_schema, FieldValidator, FormValidator,
    Issue, ValidationError,
};
