//! Library identifiers.
//!
//! Every persisted artifact gets a stable catalog id of the form
//! `AW-{year}-{USER4}-{RAND6}`: the year, a 4-hex-char hash of the owning
//! user, and a 6-hex-char random suffix.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use sha2::{Digest, Sha256};

static LIBRARY_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^AW-\d{4}-[A-F0-9]{4}-[A-F0-9]{6}$").expect("library id pattern must compile")
});

/// Generate a library id for an artifact owned by `user_id`.
pub fn generate_library_id(user_id: &str) -> String {
    let year = chrono::Utc::now().year();

    let digest = Sha256::digest(user_id.as_bytes());
    let user_short: String = digest
        .iter()
        .take(2)
        .map(|b| format!("{b:02X}"))
        .collect();

    let random: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();

    format!("AW-{year}-{user_short}-{random}")
}

/// Validate a library id.
pub fn is_valid_library_id(id: &str) -> bool {
    LIBRARY_ID_RE.is_match(id)
}
