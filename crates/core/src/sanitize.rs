//! User-facing error sanitization.
//!
//! Nothing about the internal infrastructure (provider names, HTTP
//! statuses, storage hosts, stack traces) may reach a caller. Every error
//! surfaced through the stream collapses to one generic retry-later
//! message; the raw detail survives only in server-side logs and refund
//! metadata. [`contains_internal_detail`] classifies raw messages so the
//! engine can log leaks at a higher severity and tests can assert stream
//! payloads are clean.

use std::sync::LazyLock;

use regex::Regex;

/// The one message callers ever see for a failed generation.
pub const SAFE_ERROR_MESSAGE: &str = "Airwave is tuning in, please try again in a few minutes";

/// Markers of internal infrastructure that must never reach the user.
static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)replicate",
        r"(?i)minimax",
        r"(?i)ace[\s_-]?step",
        r"(?i)flux",
        r"(?i)prediction",
        r"(?i)cloudflare",
        r"(?i)supabase",
        r"(?i)postgres",
        r"(?i)aws|s3[\s_\-.]|s3$",
        r"(?i)status:\s*\d{3}",
        r"(?i)HTTP\s+\d{3}",
        r"(?i)Bad Gateway",
        r"(?i)Internal Server Error",
        r"(?i)ECONNREFUSED|ENOTFOUND|ETIMEDOUT",
        r"(?i)dns|getaddrinfo|socket hang up",
        r"(?i)stack backtrace|panicked at",
        r"(?i)\.rs:\d+:\d+",
        r"(?i)GPU|CUDA|out of memory|OOM",
        r"(?i)bearer |api[\s_-]?key|authorization",
        r"(?i)webhook",
        r"(?i)storage gateway|object store",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("blocked pattern must compile"))
    .collect()
});

/// Whether a raw error message names internal infrastructure, either via
/// the blocklist or via structural heuristics (JSON-ish payloads, long
/// technical dumps).
pub fn contains_internal_detail(raw: &str) -> bool {
    if BLOCKED_PATTERNS.iter().any(|p| p.is_match(raw)) {
        return true;
    }
    raw.contains('{')
        || raw.contains('}')
        || (raw.contains('[') && raw.contains(']'))
        || raw.chars().count() > 120
}

/// Sanitize any raw error for the stream. Raw errors are never trusted, so
/// this always returns [`SAFE_ERROR_MESSAGE`]; the classification exists
/// for logging and tests.
pub fn sanitize_error(raw: &str) -> &'static str {
    let _ = contains_internal_detail(raw);
    SAFE_ERROR_MESSAGE
}

/// Sanitize a ledger rejection for the synchronous error path. Only a
/// small allowlist of known-safe balance messages passes through, in a
/// normalized form.
pub fn sanitize_credit_error(raw: Option<&str>) -> String {
    const SAFE_CREDIT_FRAGMENTS: &[&str] = &[
        "insufficient credits",
        "failed to deduct credits",
        "balance too low",
    ];

    if let Some(message) = raw {
        let lower = message.to_lowercase();
        if SAFE_CREDIT_FRAGMENTS.iter().any(|safe| lower.contains(safe)) {
            return "Insufficient credits. Please add more credits to continue.".to_string();
        }
    }
    "Insufficient credits".to_string()
}
