//! Content resolver for requests without user-supplied lyrics.
//!
//! Selection is deterministic: the best keyword-scored template wins, ties
//! resolve to library order, and a zero score falls back to a guaranteed-
//! valid template. The resolved text is expanded toward the length band for
//! the requested duration class and hard-capped at the provider maximum.

pub mod expand;
pub mod library;
pub mod matcher;

pub use expand::{expand_for_duration, HARD_CAP_CHARS};
pub use matcher::{find_best_match, find_branded_match, wants_branded_pack};

/// Smallest lyric size any provider accepts. Anything shorter is degenerate
/// and is replaced with the fallback template before submission.
pub const PROVIDER_MIN_CHARS: usize = 10;

/// Resolve the lyrics for a generation request.
///
/// * `user_lyrics` present -- expanded as-is.
/// * absent + `use_branded` -- the branded bonus pack (quota is enforced by
///   the engine before this is called).
/// * absent otherwise -- best library match for the prompt.
///
/// Post-condition: the returned text is between [`PROVIDER_MIN_CHARS`] and
/// [`HARD_CAP_CHARS`] characters.
pub fn resolve(
    prompt: &str,
    user_lyrics: Option<&str>,
    duration: crate::types::DurationClass,
    use_branded: bool,
) -> String {
    let base = match user_lyrics {
        Some(lyrics) => lyrics.to_string(),
        None if use_branded => find_branded_match(prompt).lyrics.to_string(),
        None => find_best_match(prompt).lyrics.to_string(),
    };

    let resolved = expand_for_duration(&base, duration);
    if resolved.chars().count() < PROVIDER_MIN_CHARS {
        // Degenerate input; never submit an invalid job.
        return expand_for_duration(library::FALLBACK.lyrics, duration);
    }
    resolved
}
