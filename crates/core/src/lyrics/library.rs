//! Curated lyric template library.
//!
//! Templates are grouped by genre with a mood and tag vocabulary used by
//! the matcher. The branded pack is a separate set unlocked once per user
//! per day via the prompt trigger.

/// One selectable lyric template.
#[derive(Debug, Clone, Copy)]
pub struct LyricTemplate {
    pub title: &'static str,
    pub genre: &'static str,
    pub mood: &'static str,
    pub tags: &'static [&'static str],
    pub lyrics: &'static str,
}

/// Keywords that signal each genre in a prompt. Genre hits score highest.
pub const GENRE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "lofi",
        &[
            "lofi", "lo-fi", "chill", "study", "relax", "mellow", "tape", "vinyl", "coffee",
            "rain", "ambient", "slow", "quiet", "soft",
        ],
    ),
    (
        "hiphop",
        &[
            "hip hop", "hiphop", "rap", "urban", "street", "hustle", "bars", "beats", "rhyme",
            "flow", "city", "grind",
        ],
    ),
    (
        "jazz",
        &[
            "jazz", "smooth", "saxophone", "sax", "trumpet", "piano", "swing", "smoky",
            "elegant", "club",
        ],
    ),
    (
        "rnb",
        &[
            "rnb", "r&b", "soul", "love", "romance", "groove", "rhythm", "passion", "heartbeat",
        ],
    ),
    (
        "pop",
        &[
            "pop", "catchy", "radio", "summer", "anthem", "upbeat", "bright", "dance",
        ],
    ),
    (
        "electronic",
        &[
            "electronic", "edm", "synth", "techno", "house", "club", "bass", "drop", "neon",
            "rave",
        ],
    ),
    (
        "rock",
        &["rock", "guitar", "metal", "punk", "riff", "loud", "stage"],
    ),
];

/// Keywords that signal each mood. Mood hits score below genre hits.
pub const MOOD_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "melancholic",
        &[
            "sad", "melancholy", "lonely", "blue", "sorrow", "tears", "faded", "lost", "missing",
            "nostalgia",
        ],
    ),
    (
        "empowering",
        &[
            "strong", "power", "rise", "overcome", "victory", "triumph", "confidence", "winner",
            "champion",
        ],
    ),
    (
        "romantic",
        &["love", "romance", "heart", "kiss", "embrace", "together", "crush"],
    ),
    (
        "peaceful",
        &["peace", "calm", "quiet", "tranquil", "serene", "gentle", "still", "zen"],
    ),
    (
        "nostalgic",
        &["nostalgia", "memory", "remember", "past", "vintage", "yesterday"],
    ),
    (
        "energetic",
        &["energy", "wild", "alive", "fire", "jump", "electric", "fast"],
    ),
    (
        "dreamy",
        &["dream", "dreamy", "haze", "clouds", "fantasy", "ethereal", "floating"],
    ),
];

/// The main template library. Order matters: score ties resolve to the
/// earliest entry.
pub const LIBRARY: &[LyricTemplate] = &[
    LyricTemplate {
        title: "Late Static",
        genre: "lofi",
        mood: "nostalgic",
        tags: &["rain", "night", "tape", "window", "memories"],
        lyrics: "Rain taps soft on the window frame\n\
                 Tape hiss hums an old refrain\n\
                 Coffee cooling by the light\n\
                 Thoughts unwinding into night",
    },
    LyricTemplate {
        title: "Paper Moons",
        genre: "lofi",
        mood: "dreamy",
        tags: &["vinyl", "dust", "afternoon", "sunlight"],
        lyrics: "Dust floats slow through afternoon\n\
                 Needle rides a paper moon\n\
                 Golden light on fading walls\n\
                 Time forgets to make its calls",
    },
    LyricTemplate {
        title: "Concrete Verses",
        genre: "hiphop",
        mood: "empowering",
        tags: &["street", "grind", "city", "hustle", "flow"],
        lyrics: "Started with a notebook and a borrowed beat\n\
                 Every verse a footprint on a concrete street\n\
                 They talk while I build, brick by bar\n\
                 Scars turned to stripes, now they know who we are",
    },
    LyricTemplate {
        title: "Blue Hour",
        genre: "jazz",
        mood: "melancholic",
        tags: &["sax", "smoky", "midnight", "club"],
        lyrics: "Saxophone leans on the midnight air\n\
                 Smoke rings curling by the bar-room chair\n\
                 One more chorus for the almost-was\n\
                 Blue hour lingers just because",
    },
    LyricTemplate {
        title: "Slow Gravity",
        genre: "rnb",
        mood: "romantic",
        tags: &["love", "closer", "heartbeat", "groove"],
        lyrics: "Pull me closer, slow gravity\n\
                 Your heartbeat keeps the time for me\n\
                 Velvet hours, nothing to prove\n\
                 We found forever inside a groove",
    },
    LyricTemplate {
        title: "Brighter Now",
        genre: "pop",
        mood: "energetic",
        tags: &["summer", "anthem", "lights", "alive"],
        lyrics: "We're running through the city lights tonight\n\
                 Everything is loud and burning bright\n\
                 Hands up till the morning comes around\n\
                 Nothing's gonna slow us down",
    },
    LyricTemplate {
        title: "Voltage Bloom",
        genre: "electronic",
        mood: "energetic",
        tags: &["neon", "bass", "drop", "pulse", "rave"],
        lyrics: "Neon pulses under midnight skin\n\
                 Bassline swallows all the noise within\n\
                 Count the static, one two three\n\
                 Let the drop set everybody free",
    },
    LyricTemplate {
        title: "Iron Choir",
        genre: "rock",
        mood: "empowering",
        tags: &["guitar", "stage", "loud", "fire"],
        lyrics: "Strike the strings like thunder cracks\n\
                 No surrender, no looking back\n\
                 Raise your voice with the iron choir\n\
                 We were born to feed the fire",
    },
    LyricTemplate {
        title: "Quiet Shoreline",
        genre: "lofi",
        mood: "peaceful",
        tags: &["ocean", "waves", "breeze", "drift"],
        lyrics: "Waves rehearse their patient song\n\
                 Salt and stillness all along\n\
                 Breathe the evening, let it stay\n\
                 Let the tide take the day away",
    },
    LyricTemplate {
        title: "Rearview Summer",
        genre: "pop",
        mood: "nostalgic",
        tags: &["memory", "highway", "photograph", "yesterday"],
        lyrics: "Photographs on the dashboard fade\n\
                 Every mile a song we made\n\
                 Rearview summer, golden haze\n\
                 We were endless in those days",
    },
];

/// Branded bonus pack, selectable once per user per day via the prompt
/// trigger. Order matters as with [`LIBRARY`].
pub const BRANDED_PACK: &[LyricTemplate] = &[
    LyricTemplate {
        title: "Airwave Original",
        genre: "hiphop",
        mood: "empowering",
        tags: &["airwave", "og", "signal", "city"],
        lyrics: "Beat drops hard and the city listens close\n\
                 Airwave on the dial, that's the signal most\n\
                 Every line a spark in the dark tonight\n\
                 Streets know the name when the mix hits right",
    },
    LyricTemplate {
        title: "Signal Chasers",
        genre: "electronic",
        mood: "energetic",
        tags: &["airwave", "neon", "frequency", "glow"],
        lyrics: "Tuned in low where the frequencies glow\n\
                 Airwave carries everything we know\n\
                 Chase the signal through the static sea\n\
                 Broadcast hearts on every street",
    },
    LyricTemplate {
        title: "Night Transmission",
        genre: "lofi",
        mood: "dreamy",
        tags: &["airwave", "radio", "midnight", "drift"],
        lyrics: "Midnight dial and a slow warm hum\n\
                 Airwave playing till the morning comes\n\
                 Static soft as falling rain\n\
                 Drift along the wave again",
    },
];

/// Guaranteed-valid fallback used when nothing matches or the resolved
/// content is degenerate.
pub const FALLBACK: LyricTemplate = LyricTemplate {
    title: "Open Sky",
    genre: "pop",
    mood: "energetic",
    tags: &["anthem", "alive", "sky"],
    lyrics: "Feel the rhythm rolling through the night\n\
             Every heartbeat keeping time just right\n\
             Open sky above, the road below\n\
             Turn it up and let the whole world know",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_has_usable_lyrics() {
        for template in LIBRARY.iter().chain(BRANDED_PACK) {
            assert!(
                template.lyrics.chars().count() >= 10,
                "{} too short",
                template.title
            );
            assert!(!template.tags.is_empty(), "{} has no tags", template.title);
        }
    }

    #[test]
    fn fallback_is_valid() {
        assert!(FALLBACK.lyrics.chars().count() >= 10);
    }

    #[test]
    fn branded_templates_carry_the_brand() {
        for template in BRANDED_PACK {
            assert!(template.lyrics.contains("Airwave"), "{}", template.title);
        }
    }

    #[test]
    fn genre_keywords_cover_every_library_genre() {
        for template in LIBRARY {
            assert!(
                GENRE_KEYWORDS.iter().any(|(g, _)| *g == template.genre),
                "no keywords for genre {}",
                template.genre
            );
        }
    }
}
