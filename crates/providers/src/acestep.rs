//! Multilingual music provider adapter.
//!
//! Drives the ACE-Step model, which natively handles non-English and
//! non-Latin-script lyrics. The model is tag-driven: genre tags are
//! extracted from the prompt, and the duration class maps to an explicit
//! target length in seconds.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::api::{PredictionsApi, ProviderApiError};
use crate::types::{MusicProvider, ProviderId, ProviderJobHandle, ProviderJobSpec, StatusUpdate};

/// Genre words the model understands as style tags.
static GENRE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(rock|pop|jazz|blues|electronic|classical|hip hop|rap|country|metal|folk|reggae|indie|funk|soul|rnb|edm|house|techno|ambient|chill|lofi)\b",
    )
    .expect("genre tag pattern must compile")
});

/// Extract comma-joined genre tags from a prompt, falling back to a
/// neutral tag pair when nothing matches.
pub fn extract_genre_tags(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    let tags: Vec<&str> = GENRE_TAG_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .collect();
    if tags.is_empty() {
        "instrumental,melodic".to_string()
    } else {
        tags.join(",")
    }
}

pub struct AceStepProvider {
    api: PredictionsApi,
    model: String,
}

impl AceStepProvider {
    /// * `model` - model slug at the gateway, e.g. `ace-step/ace-step`.
    pub fn new(api: PredictionsApi, model: String) -> Self {
        Self { api, model }
    }

    fn build_input(spec: &ProviderJobSpec) -> serde_json::Value {
        serde_json::json!({
            "tags": extract_genre_tags(&spec.prompt),
            "lyrics": spec.lyrics,
            "duration": spec.duration.target_seconds(),
            "number_of_steps": 60,
            "guidance_scale": 15,
            "scheduler": "euler",
            "guidance_type": "apg",
            "seed": -1,
        })
    }
}

#[async_trait]
impl MusicProvider for AceStepProvider {
    fn id(&self) -> ProviderId {
        ProviderId::AceStep
    }

    async fn submit(&self, spec: &ProviderJobSpec) -> Result<ProviderJobHandle, ProviderApiError> {
        let input = Self::build_input(spec);
        let prediction = self.api.create_prediction(&self.model, &input).await?;

        tracing::info!(
            provider = %self.id(),
            prediction_id = %prediction.id,
            language = %spec.language,
            "Music job submitted",
        );

        Ok(ProviderJobHandle {
            job_id: prediction.id,
            provider: self.id(),
        })
    }

    async fn status(&self, handle: &ProviderJobHandle) -> Result<StatusUpdate, ProviderApiError> {
        let prediction = self.api.get_prediction(&handle.job_id).await?;
        Ok(StatusUpdate {
            status: prediction.status.into(),
            error: prediction.error_message(),
            output: prediction.output,
        })
    }

    async fn cancel(&self, handle: &ProviderJobHandle) -> Result<(), ProviderApiError> {
        self.api.cancel_prediction(&handle.job_id).await
    }
}
