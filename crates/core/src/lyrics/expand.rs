//! Duration-band expansion and truncation.
//!
//! Short base lyrics are grown toward the band for the requested duration
//! by appending structural sections: a repeat verse, then a chorus built
//! from the opening lines, and for the longest band a bridge and an outro.
//! If the structured sections still fall short, the chorus repeats until
//! the band minimum is reached. Everything is finally capped at
//! [`HARD_CAP_CHARS`] with an ellipsis marker.

use crate::types::DurationClass;

/// Absolute upper bound any provider accepts for lyrics.
pub const HARD_CAP_CHARS: usize = 600;

/// Target character-length band for one duration class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBand {
    pub min: usize,
    pub max: usize,
}

/// Band for each duration class.
pub fn band_for(duration: DurationClass) -> LengthBand {
    match duration {
        DurationClass::Short => LengthBand { min: 200, max: 300 },
        DurationClass::Medium => LengthBand { min: 350, max: 500 },
        DurationClass::Long => LengthBand { min: 500, max: 600 },
    }
}

/// Expand `base` toward the band for `duration`, then hard-truncate.
/// A blank base stays blank; the resolver substitutes the fallback for it.
pub fn expand_for_duration(base: &str, duration: DurationClass) -> String {
    if base.trim().is_empty() {
        return String::new();
    }

    let band = band_for(duration);

    if char_len(base) >= band.min {
        return truncate_with_ellipsis(base, HARD_CAP_CHARS);
    }

    let mut expanded = base.to_string();
    let chorus = first_lines(base, 2);

    if char_len(&expanded) < band.min {
        expanded.push_str("\n\n[Verse 2]\n");
        expanded.push_str(base);
    }
    if char_len(&expanded) < band.min && !chorus.is_empty() {
        expanded.push_str("\n\n[Chorus]\n");
        expanded.push_str(&chorus);
    }
    if duration == DurationClass::Long {
        if char_len(&expanded) < band.min && !chorus.is_empty() {
            expanded.push_str("\n\n[Bridge]\n");
            expanded.push_str(&chorus);
        }
        if char_len(&expanded) < band.min {
            expanded.push_str("\n\n[Outro]\n");
            expanded.push_str(&first_lines(base, 1));
        }
    }

    // Repeat the chorus until the band minimum is met. The growth step is
    // non-empty whenever the base is, so this terminates.
    if !chorus.is_empty() {
        while char_len(&expanded) < band.min {
            expanded.push_str("\n\n[Chorus]\n");
            expanded.push_str(&chorus);
        }
    }

    truncate_with_ellipsis(&expanded, HARD_CAP_CHARS)
}

/// First `n` non-empty lines of `text`, joined by newlines.
fn first_lines(text: &str, n: usize) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .take(n)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Character count (not bytes -- lyrics may be non-ASCII).
fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Truncate to `cap` characters total, replacing the tail with `...` when
/// over. Char-boundary safe.
fn truncate_with_ellipsis(text: &str, cap: usize) -> String {
    if char_len(text) <= cap {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(cap - 3).collect();
    truncated.push_str("...");
    truncated
}
