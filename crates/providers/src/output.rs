//! Terminal output normalization.
//!
//! Providers return their artifact in one of three shapes: a bare URL
//! string, an object carrying a `url` field, or an array whose first
//! element is either of those. [`extract_output_url`] maps all of them
//! onto one canonical URL instead of scattering shape probes through the
//! controller.

/// Normalize a provider's terminal output payload to the artifact URL.
/// Returns `None` when no URL can be found -- the controller treats that
/// as a provider failure.
pub fn extract_output_url(output: &serde_json::Value) -> Option<String> {
    match output {
        serde_json::Value::String(url) => non_empty(url),
        serde_json::Value::Object(map) => map
            .get("url")
            .and_then(|u| u.as_str())
            .and_then(non_empty),
        serde_json::Value::Array(items) => items.first().and_then(|first| match first {
            serde_json::Value::String(url) => non_empty(url),
            serde_json::Value::Object(map) => map
                .get("url")
                .and_then(|u| u.as_str())
                .and_then(non_empty),
            _ => None,
        }),
        _ => None,
    }
}

fn non_empty(url: &str) -> Option<String> {
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}
