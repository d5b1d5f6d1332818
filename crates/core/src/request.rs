//! Request validation and normalization.
//!
//! [`RawGenerationRequest`] is the wire shape; [`normalize`] turns it into
//! the immutable [`GenerationRequest`] or a [`CoreError::Validation`]
//! naming the offending field. Pure -- no side effects.

use serde::Deserialize;
use validator::Validate;

use crate::error::CoreError;
use crate::types::{AudioFormat, DurationClass, FormatParams, GenerationRequest, UserId};

/// Minimum / maximum title length after trimming.
pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;

/// Minimum / maximum prompt length.
pub const PROMPT_MIN: usize = 10;
pub const PROMPT_MAX: usize = 300;

/// Bounds on user-supplied lyrics (pre-expansion).
pub const LYRICS_MIN: usize = 10;
pub const LYRICS_MAX: usize = 600;

fn default_language() -> String {
    "english".to_string()
}

fn default_bitrate() -> u32 {
    FormatParams::default().bitrate
}

fn default_sample_rate() -> u32 {
    FormatParams::default().sample_rate
}

/// Raw request body as received from the caller. Field bounds are declared
/// here; trimming-sensitive checks are re-applied in [`normalize`].
#[derive(Debug, Deserialize, Validate)]
pub struct RawGenerationRequest {
    #[validate(length(min = 3, max = 100, message = "title must be 3-100 characters"))]
    pub title: String,

    #[validate(length(min = 10, max = 300, message = "prompt must be 10-300 characters"))]
    pub prompt: String,

    /// Optional creative input. Empty or whitespace-only is treated as absent.
    #[validate(length(max = 600, message = "lyrics must be at most 600 characters"))]
    #[serde(default)]
    pub lyrics: Option<String>,

    #[serde(default)]
    pub duration: DurationClass,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub audio_format: AudioFormat,

    #[serde(default = "default_bitrate")]
    pub bitrate: u32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default)]
    pub generate_cover_art: bool,
}

/// Validate and normalize a raw request into a [`GenerationRequest`].
///
/// Trims `title`, `prompt` and `lyrics`; blank lyrics collapse to `None`
/// so the content resolver takes over. Length bounds are enforced on the
/// trimmed values.
pub fn normalize(user_id: UserId, raw: RawGenerationRequest) -> Result<GenerationRequest, CoreError> {
    if let Err(errors) = raw.validate() {
        return Err(first_validation_error(&errors));
    }

    let title = raw.title.trim().to_string();
    if title.chars().count() < TITLE_MIN || title.chars().count() > TITLE_MAX {
        return Err(CoreError::validation(
            "title",
            format!("title must be {TITLE_MIN}-{TITLE_MAX} characters"),
        ));
    }

    let prompt = raw.prompt.trim().to_string();
    if prompt.chars().count() < PROMPT_MIN || prompt.chars().count() > PROMPT_MAX {
        return Err(CoreError::validation(
            "prompt",
            format!("prompt must be {PROMPT_MIN}-{PROMPT_MAX} characters"),
        ));
    }

    let lyrics = match raw.lyrics {
        Some(l) => {
            let trimmed = l.trim();
            if trimmed.is_empty() {
                None
            } else if trimmed.chars().count() < LYRICS_MIN {
                return Err(CoreError::validation(
                    "lyrics",
                    format!("lyrics must be at least {LYRICS_MIN} characters"),
                ));
            } else {
                Some(trimmed.to_string())
            }
        }
        None => None,
    };

    Ok(GenerationRequest {
        user_id,
        title,
        prompt,
        lyrics,
        duration: raw.duration,
        language: raw.language.trim().to_lowercase(),
        format: FormatParams {
            audio_format: raw.audio_format,
            bitrate: raw.bitrate,
            sample_rate: raw.sample_rate,
        },
        generate_cover_art: raw.generate_cover_art,
    })
}

/// Collapse a `validator` error set into the first field-level [`CoreError`].
fn first_validation_error(errors: &validator::ValidationErrors) -> CoreError {
    for (field, field_errors) in errors.field_errors() {
        if let Some(error) = field_errors.first() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("invalid value for {field}"));
            return CoreError::validation(field.to_string(), message);
        }
    }
    CoreError::validation("request", "invalid request")
}
