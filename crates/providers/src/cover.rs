//! Cover-art image adapter for the optional sub-job.

use async_trait::async_trait;

use crate::api::{PredictionsApi, ProviderApiError};
use crate::types::{CoverArtProvider, ProviderId, ProviderJobHandle, StatusUpdate};

pub struct CoverArtClient {
    api: PredictionsApi,
    model: String,
}

impl CoverArtClient {
    /// * `model` - image model slug at the gateway.
    pub fn new(api: PredictionsApi, model: String) -> Self {
        Self { api, model }
    }

    fn build_input(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "prompt": format!("{prompt} music album cover art, professional music artwork"),
            "aspect_ratio": "1:1",
            "output_format": "jpg",
            "output_quality": 95,
            "go_fast": true,
        })
    }
}

#[async_trait]
impl CoverArtProvider for CoverArtClient {
    async fn submit(&self, prompt: &str, title: &str) -> Result<ProviderJobHandle, ProviderApiError> {
        let input = Self::build_input(prompt);
        let prediction = self.api.create_prediction(&self.model, &input).await?;

        tracing::info!(
            prediction_id = %prediction.id,
            title = %title,
            "Cover art job submitted",
        );

        Ok(ProviderJobHandle {
            job_id: prediction.id,
            provider: ProviderId::Flux,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_decorates_the_prompt() {
        let input = CoverArtClient::build_input("upbeat synth pop");
        let prompt = input["prompt"].as_str().unwrap();
        assert!(prompt.starts_with("upbeat synth pop"));
        assert!(prompt.contains("album cover art"));
        assert_eq!(input["aspect_ratio"], "1:1");
    }
}
