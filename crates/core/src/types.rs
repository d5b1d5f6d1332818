//! Shared domain types.

use serde::{Deserialize, Serialize};

/// External identity of the caller, resolved by the upstream identity
/// collaborator before a request ever reaches this service.
pub type UserId = String;

/// Credit amounts. Negative values denote spend in transaction logs.
pub type Credits = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// Request value objects
// ---------------------------------------------------------------------------

/// Requested length class of the generated track. Drives the lyric
/// expansion band and the multilingual provider's duration parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationClass {
    Short,
    #[default]
    Medium,
    Long,
}

impl DurationClass {
    /// Target audio duration in seconds, passed to providers that accept an
    /// explicit duration.
    pub fn target_seconds(self) -> u32 {
        match self {
            DurationClass::Short => 60,
            DurationClass::Medium => 120,
            DurationClass::Long => 180,
        }
    }
}

/// Output container format for the generated audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    Flac,
}

impl AudioFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }

    /// File extension for persisted artifacts.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

/// Audio encoding parameters forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatParams {
    pub audio_format: AudioFormat,
    pub bitrate: u32,
    pub sample_rate: u32,
}

impl Default for FormatParams {
    fn default() -> Self {
        Self {
            audio_format: AudioFormat::Mp3,
            bitrate: 256_000,
            sample_rate: 44_100,
        }
    }
}

/// A validated, normalized generation request. Immutable for the lifetime
/// of one job; created at request ingress by [`crate::request::normalize`].
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub user_id: UserId,
    pub title: String,
    pub prompt: String,
    /// User-supplied creative input. `None` means the content resolver
    /// selects lyrics from the library.
    pub lyrics: Option<String>,
    pub duration: DurationClass,
    /// Declared lyric language (e.g. `"english"`, `"hindi"`). The router
    /// may override this based on script evidence in the resolved lyrics.
    pub language: String,
    pub format: FormatParams,
    /// Request an accompanying cover image as an isolated sub-job.
    pub generate_cover_art: bool,
}

// ---------------------------------------------------------------------------
// Ledger value objects
// ---------------------------------------------------------------------------

/// Result of a successful atomic deduction. A hold exists if and only if a
/// matching refund or a persisted generation result eventually exists.
#[derive(Debug, Clone)]
pub struct CreditHold {
    pub amount: Credits,
    pub balance_after: Credits,
    /// Correlation id linking the deduction to its eventual refund record
    /// or catalog entry.
    pub transaction_id: uuid::Uuid,
}

/// Why credits were returned to the caller. Tags the refund record so
/// audit queries can distinguish failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    ProviderFailed,
    TimedOut,
    Canceled,
    PersistenceFailed,
}

impl RefundReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RefundReason::ProviderFailed => "provider_failed",
            RefundReason::TimedOut => "timed_out",
            RefundReason::Canceled => "canceled",
            RefundReason::PersistenceFailed => "persistence_failed",
        }
    }
}

/// Terminal success payload: the thing that discharges a [`CreditHold`]
/// without a refund. Created once, after the artifact is durably stored.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub artifact_url: String,
    pub provider: String,
    pub language: String,
    pub audio_format: AudioFormat,
    pub credits_deducted: Credits,
    pub library_id: String,
}
