//! Remote URL policy: the allowlist deciding which data sources may be
//! fetched, and the combined eligibility check the renderer uses.

use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use formwork_schema::is_interpolated;
use formwork_types::{DataSource, RemotePattern};

/// Default port per scheme when the URL omits an explicit one.
fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "https" => Some(443),
        "http" => Some(80),
        _ => None,
    }
}

fn pattern_matches(pattern: &RemotePattern, url: &Url) -> bool {
    if let Some(protocol) = &pattern.protocol {
        if protocol.trim_end_matches(':') != url.scheme() {
            return false;
        }
    }
    if let Some(hostname) = &pattern.hostname {
        if url.host_str() != Some(hostname.as_str()) {
            return false;
        }
    }
    if let Some(port) = pattern.port {
        let url_port = url.port().or_else(|| default_port(url.scheme()));
        if url_port != Some(port) {
            return false;
        }
    }
    true
}

/// Decide whether `url` may be fetched under the given allowlist.
///
/// `None` allows everything. Relative (same-origin) URLs are always allowed
/// regardless of patterns. An empty list blocks every external URL; otherwise
/// at least one pattern must match the URL's protocol/hostname/port.
pub fn match_remote_pattern(url: &str, patterns: Option<&[RemotePattern]>) -> bool {
    let Some(patterns) = patterns else {
        return true;
    };

    let Ok(parsed) = Url::parse(url) else {
        // Unparseable as absolute means relative, which is same-origin.
        return true;
    };

    patterns.iter().any(|pattern| pattern_matches(pattern, &parsed))
}

/// The single eligibility decision for a data source: its URL must be fully
/// interpolated and allowed by the remote pattern list. Both failures are
/// silent local policy decisions; the field just receives no data.
pub fn is_fetchable(source: &DataSource, patterns: Option<&[RemotePattern]>) -> bool {
    if is_interpolated(&Value::String(source.url.clone())) {
        debug!(url = %source.url, "source url not fully interpolated, holding fetch");
        return false;
    }
    if !match_remote_pattern(&source.url, patterns) {
        debug!(url = %source.url, "source url blocked by remote pattern list");
        return false;
    }
    true
}
