//! Merging of partial data-source contributions targeting one field.
//!
//! Several source events from different fields may target the same dependent
//! field; the renderer folds their contributions into a single request
//! descriptor before fetching.

use formwork_types::DataSource;

fn split_url(url: &str) -> (&str, &str) {
    match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    }
}

fn parse_query(query: &str) -> Vec<(String, Option<String>)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (pair.to_string(), None),
        })
        .collect()
}

/// Merge two URLs: the accumulator's path wins when non-empty, query params
/// are unioned with the later URL's params overwriting on key collision,
/// first-seen ordering preserved.
fn merge_url(base: &str, next: &str) -> String {
    let (base_path, base_query) = split_url(base);
    let (next_path, next_query) = split_url(next);

    let path = if base_path.is_empty() { next_path } else { base_path };

    let mut params = parse_query(base_query);
    for (key, value) in parse_query(next_query) {
        match params.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => params.push((key, value)),
        }
    }

    if params.is_empty() {
        return path.to_string();
    }
    let query: Vec<String> = params
        .into_iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{key}={value}"),
            None => key,
        })
        .collect();
    format!("{path}?{}", query.join("&"))
}

fn merge_into(mut acc: DataSource, next: &DataSource) -> DataSource {
    acc.url = merge_url(&acc.url, &next.url);

    // Bodies shallow-merge when both sides are objects, otherwise the later
    // non-null value wins outright.
    acc.body = match (acc.body.take(), next.body.clone()) {
        (Some(serde_json::Value::Object(mut base)), Some(serde_json::Value::Object(update))) => {
            base.extend(update);
            Some(serde_json::Value::Object(base))
        }
        (base, None) => base,
        (_, update) => update,
    };

    acc.headers = match (acc.headers.take(), next.headers.clone()) {
        (Some(mut base), Some(update)) => {
            base.extend(update);
            Some(base)
        }
        (base, None) => base,
        (_, update) => update,
    };

    acc.method = next.method.clone().or(acc.method);
    acc.cache = next.cache.or(acc.cache);
    acc.namespace = next.namespace.clone().or(acc.namespace);
    acc
}

/// Left-fold a list of partial data sources into one request descriptor.
/// Empty input yields `None`.
pub fn merge_source(sources: &[DataSource]) -> Option<DataSource> {
    let mut iter = sources.iter();
    let first = iter.next()?.clone();
    Some(iter.fold(first, |acc, next| merge_into(acc, next)))
}
