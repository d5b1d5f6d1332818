//! Provider routing.
//!
//! Pure decision function, evaluated once per request:
//!
//! ```text
//! resolved lyrics contain a multilingual-family script?
//!         yes -> AceStep   (script evidence overrides declared language)
//!         no  -> declared language English?
//!                    yes -> Minimax (default)
//!                    no  -> AceStep
//! ```
//!
//! The multilingual family covers the scripts the ACE-Step model handles
//! natively: the Indic scripts, Arabic, CJK, Kana, Hangul and the major
//! Southeast-Asian scripts.

use crate::types::ProviderId;

/// Unicode ranges (inclusive) of the multilingual provider's script family.
const FAMILY_SCRIPT_RANGES: &[(u32, u32)] = &[
    (0x0900, 0x097F), // Devanagari
    (0x0980, 0x09FF), // Bengali
    (0x0A00, 0x0A7F), // Gurmukhi
    (0x0A80, 0x0AFF), // Gujarati
    (0x0B00, 0x0B7F), // Oriya
    (0x0B80, 0x0BFF), // Tamil
    (0x0C00, 0x0C7F), // Telugu
    (0x0C80, 0x0CFF), // Kannada
    (0x0D00, 0x0D7F), // Malayalam
    (0x0600, 0x06FF), // Arabic
    (0x0750, 0x077F), // Arabic Supplement
    (0x4E00, 0x9FFF), // CJK Unified Ideographs
    (0x3040, 0x309F), // Hiragana
    (0x30A0, 0x30FF), // Katakana
    (0xAC00, 0xD7AF), // Hangul Syllables
    (0x0E00, 0x0E7F), // Thai
    (0x0E80, 0x0EFF), // Lao
    (0x1000, 0x109F), // Myanmar
    (0x1780, 0x17FF), // Khmer
];

/// Select the provider for a request.
///
/// `language` is the declared (already lowercased) lyric language;
/// `lyrics` is the resolved content, inspected for script evidence.
pub fn route(language: &str, lyrics: &str) -> ProviderId {
    if contains_family_script(lyrics) {
        return ProviderId::AceStep;
    }

    let lang = language.trim();
    if lang.is_empty() || lang == "english" || lang == "en" {
        ProviderId::Minimax
    } else {
        ProviderId::AceStep
    }
}

/// Whether any character of `text` falls inside the family's script ranges.
fn contains_family_script(text: &str) -> bool {
    text.chars().any(|c| {
        let cp = c as u32;
        FAMILY_SCRIPT_RANGES
            .iter()
            .any(|&(start, end)| cp >= start && cp <= end)
    })
}
