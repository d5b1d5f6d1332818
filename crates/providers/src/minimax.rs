//! Default music provider adapter.
//!
//! Drives the MiniMax vocal model: takes the full lyric text plus a style
//! prompt and the audio encoding parameters. Handles English-language
//! requests (see [`crate::router`]).

use async_trait::async_trait;

use crate::api::{PredictionsApi, ProviderApiError};
use crate::types::{MusicProvider, ProviderId, ProviderJobHandle, ProviderJobSpec, StatusUpdate};

pub struct MinimaxProvider {
    api: PredictionsApi,
    model: String,
}

impl MinimaxProvider {
    /// * `model` - model slug at the gateway, e.g. `minimax/music-1.5`.
    pub fn new(api: PredictionsApi, model: String) -> Self {
        Self { api, model }
    }

    fn build_input(spec: &ProviderJobSpec) -> serde_json::Value {
        serde_json::json!({
            "lyrics": spec.lyrics,
            "prompt": spec.prompt,
            "bitrate": spec.format.bitrate,
            "sample_rate": spec.format.sample_rate,
            "audio_format": spec.format.audio_format.as_str(),
        })
    }
}

#[async_trait]
impl MusicProvider for MinimaxProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Minimax
    }

    async fn submit(&self, spec: &ProviderJobSpec) -> Result<ProviderJobHandle, ProviderApiError> {
        let input = Self::build_input(spec);
        let prediction = self.api.create_prediction(&self.model, &input).await?;

        tracing::info!(
            provider = %self.id(),
            prediction_id = %prediction.id,
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
