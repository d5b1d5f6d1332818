//! REST client for the predictions API shared by all providers.
//!
//! Wraps the prediction lifecycle endpoints (create, status, cancel) using
//! [`reqwest`]. Each adapter owns a [`PredictionsApi`] configured with the
//! gateway base URL and API key.

use serde::Deserialize;

use crate::types::JobStatus;

/// HTTP client for one predictions API gateway.
pub struct PredictionsApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Wire status values reported by the predictions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl From<PredictionStatus> for JobStatus {
    fn from(status: PredictionStatus) -> Self {
        match status {
            PredictionStatus::Starting => JobStatus::Submitted,
            PredictionStatus::Processing => JobStatus::Running,
            PredictionStatus::Succeeded => JobStatus::Succeeded,
            PredictionStatus::Failed => JobStatus::Failed,
            PredictionStatus::Canceled => JobStatus::Canceled,
            // Unrecognized states keep the poll loop going; the attempt
            // budget bounds it.
            PredictionStatus::Unknown => JobStatus::Running,
        }
    }
}

/// One prediction as returned by the API.
#[derive(Debug, Deserialize)]
pub struct Prediction {
    /// Server-assigned prediction id.
    pub id: String,
    pub status: PredictionStatus,
    /// Terminal output payload; shape varies by model.
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    /// Error detail; a string for most models, an object for some.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl Prediction {
    /// Error detail flattened to a string, whatever the wire shape.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| match e {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Errors from the predictions REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Predictions API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl PredictionsApi {
    /// Create a new client for a predictions gateway.
    ///
    /// * `base_url` - e.g. `https://api.example.com`.
    /// * `api_key`  - bearer token for the gateway.
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`] (connection
    /// pooling across adapters).
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Queue a prediction against a model.
    ///
    /// Sends `POST /v1/models/{model}/predictions` with the model input.
    pub async fn create_prediction(
        &self,
        model: &str,
        input: &serde_json::Value,
    ) -> Result<Prediction, ProviderApiError> {
        let body = serde_json::json!({ "input": input });

        let response = self
            .client
            .post(format!("{}/v1/models/{model}/predictions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the current state of a prediction.
    ///
    /// Sends `GET /v1/predictions/{id}`.
    pub async fn get_prediction(&self, id: &str) -> Result<Prediction, ProviderApiError> {
        let response = self
            .client
            .get(format!("{}/v1/predictions/{id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Ask the gateway to cancel a queued or running prediction.
    ///
    /// Sends `POST /v1/predictions/{id}/cancel`.
    pub async fn cancel_prediction(&self, id: &str) -> Result<(), ProviderApiError> {
        let response = self
            .client
            .post(format!("{}/v1/predictions/{id}/cancel", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, or map it to a
    /// [`ProviderApiError::Api`] with the status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ProviderApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
