//! Schema document parsing, reference resolution, preparation, and template
//! interpolation.
//!
//! This crate owns the boundary between raw JSON schema documents and the
//! typed AST in `formwork-types`: `$ref` resolution with cycle detection,
//! the prepare (resolve-then-sort) pipeline, dot-path extraction, option
//! flattening, and the `{key}` interpolation engine.

pub mod interpolate;
pub mod parse;
pub mod paths;
pub mod prepare;
pub mod resolver;

pub use interpolate::{interpolate_for_display, interpolate_for_url, is_interpolated};
pub use parse::{parse_data_source, parse_document};
pub use paths::{entity_value, extract, flatten_options};
pub use prepare::prepare;
pub use resolver::{resolve_refs, DefId, DefinitionTable};
