//! Keyword-scored template selection.
//!
//! Scoring weights: genre keyword hit 10, mood keyword hit 5, tag hit 3,
//! lyric-text word hit 1. Selection is deterministic: the highest score
//! wins, ties resolve to library order, and a zero score resolves to the
//! fallback template.

use super::library::{LyricTemplate, BRANDED_PACK, FALLBACK, GENRE_KEYWORDS, LIBRARY, MOOD_KEYWORDS};

/// Prompt substring that requests the branded bonus pack.
pub const BRAND_TRIGGER: &str = "airwave";

/// Whether the prompt asks for the branded bonus pack. The caller must
/// consult the per-user daily quota before honoring this.
pub fn wants_branded_pack(prompt: &str) -> bool {
    prompt.to_lowercase().contains(BRAND_TRIGGER)
}

/// Pick the best-matching template from the main library.
pub fn find_best_match(prompt: &str) -> &'static LyricTemplate {
    best_of(LIBRARY, prompt).unwrap_or(&FALLBACK)
}

/// Pick the best-matching template from the branded pack. A zero score
/// falls back to the first branded entry so the trigger always lands on
/// branded content.
pub fn find_branded_match(prompt: &str) -> &'static LyricTemplate {
    best_of(BRANDED_PACK, prompt).unwrap_or(&BRANDED_PACK[0])
}

/// Highest-scoring template in `pool`, or `None` if nothing scored.
fn best_of(pool: &'static [LyricTemplate], prompt: &str) -> Option<&'static LyricTemplate> {
    let normalized = prompt.to_lowercase();

    let mut best: Option<(&'static LyricTemplate, u32)> = None;
    for template in pool {
        let score = match_score(&normalized, template);
        // Strictly-greater keeps the earliest entry on ties.
        if score > 0 && best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((template, score));
        }
    }
    best.map(|(template, _)| template)
}

/// Score one template against a lowercased prompt.
fn match_score(normalized_prompt: &str, template: &LyricTemplate) -> u32 {
    let mut score = 0;

    if let Some((_, keywords)) = GENRE_KEYWORDS.iter().find(|(g, _)| *g == template.genre) {
        for keyword in *keywords {
            if normalized_prompt.contains(keyword) {
                score += 10;
            }
        }
    }

    if let Some((_, keywords)) = MOOD_KEYWORDS.iter().find(|(m, _)| *m == template.mood) {
        for keyword in *keywords {
            if normalized_prompt.contains(keyword) {
                score += 5;
            }
        }
    }

    for tag in template.tags {
        if normalized_prompt.contains(tag) {
            score += 3;
        }
    }

    let lyrics_lower = template.lyrics.to_lowercase();
    for word in normalized_prompt.split_whitespace().filter(|w| w.len() > 3) {
        if lyrics_lower.contains(word) {
            score += 1;
        }
    }

    score
}
