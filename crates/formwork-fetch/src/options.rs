//! Turning fetched responses into option lists.

use serde_json::Value;
use tracing::debug;

use formwork_schema::{extract, flatten_options};
use formwork_types::{Advanced, DataSource, OptionPair, RemotePattern, Result};

use crate::provider::FetchProvider;
use crate::remote::is_fetchable;

/// Pick the option array out of a fetched response, applying the source's
/// `namespace` dot-path. A namespace that misses, or a non-array result,
/// yields no options.
pub fn select_options(response: &Value, source: &DataSource) -> Vec<Value> {
    let selected = match &source.namespace {
        Some(namespace) => match extract(response, namespace) {
            Some(value) => value,
            None => {
                debug!(namespace = %namespace, "response namespace missed, no options");
                return Vec::new();
            }
        },
        None => response,
    };
    selected.as_array().cloned().unwrap_or_default()
}

/// Fetch a field's options end to end: eligibility check, dispatch, namespace
/// selection, and flattening per the field's `advanced` mapping. An
/// ineligible source is not an error; the field renders without options.
pub async fn fetch_options(
    provider: &dyn FetchProvider,
    source: &DataSource,
    advanced: &Advanced,
    patterns: Option<&[RemotePattern]>,
) -> Result<Vec<OptionPair>> {
    if !is_fetchable(source, patterns) {
        return Ok(Vec::new());
    }
    let response = provider.fetch(source).await?;
    let values = select_options(&response, source);
    Ok(flatten_options(
        &values,
        advanced.mapping.as_ref(),
        advanced.reverse,
    ))
}
