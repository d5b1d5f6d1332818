//! Provider contract types.

use airwave_core::types::{DurationClass, FormatParams};
use async_trait::async_trait;

use crate::api::ProviderApiError;

// ---------------------------------------------------------------------------
// Identity and status
// ---------------------------------------------------------------------------

/// Which external provider a job was routed to. The decision is made once
/// per request and never revisited mid-job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Default provider for English-language melodic content.
    Minimax,
    /// Multilingual provider; natively handles non-Latin-script lyrics.
    AceStep,
    /// Image model used for cover-art sub-jobs.
    Flux,
}

impl ProviderId {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Minimax => "minimax",
            ProviderId::AceStep => "ace-step",
            ProviderId::Flux => "flux",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last observed state of an external job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    /// Assigned by the controller when the attempt budget runs out; never
    /// reported by a provider.
    TimedOut,
}

impl JobStatus {
    /// Whether no further automatic transition will occur.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Submitted | JobStatus::Running)
    }
}

// ---------------------------------------------------------------------------
// Job values
// ---------------------------------------------------------------------------

/// Opaque reference to one submitted external job. Owned exclusively by the
/// controller task that created it.
#[derive(Debug, Clone)]
pub struct ProviderJobHandle {
    pub job_id: String,
    pub provider: ProviderId,
}

/// Everything an adapter needs to build its model input.
#[derive(Debug, Clone)]
pub struct ProviderJobSpec {
    pub prompt: String,
    pub lyrics: String,
    pub language: String,
    pub duration: DurationClass,
    pub format: FormatParams,
}

/// One observation from a status poll.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: JobStatus,
    /// Terminal payload; shape varies by provider (see [`crate::output`]).
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider traits
// ---------------------------------------------------------------------------

/// A music generation provider. Implementations are constructed with their
/// endpoint/model configuration injected so tests can substitute fakes.
#[async_trait]
pub trait MusicProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Submit a job. Returns the provider-assigned handle.
    async fn submit(&self, spec: &ProviderJobSpec) -> Result<ProviderJobHandle, ProviderApiError>;

    /// Poll the current status of a submitted job.
    async fn status(&self, handle: &ProviderJobHandle) -> Result<StatusUpdate, ProviderApiError>;

    /// Best-effort cancellation of a queued or running job.
    async fn cancel(&self, handle: &ProviderJobHandle) -> Result<(), ProviderApiError>;
}

/// An image provider used for the optional cover-art sub-job.
#[async_trait]
pub trait CoverArtProvider: Send + Sync {
    async fn submit(&self, prompt: &str, title: &str) -> Result<ProviderJobHandle, ProviderApiError>;

    async fn status(&self, handle: &ProviderJobHandle) -> Result<StatusUpdate, ProviderApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(JobStatus::TimedOut.is_terminal());
        assert!(!JobStatus::Submitted.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
