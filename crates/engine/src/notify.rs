//! Notification collaborator.
//!
//! Strictly best-effort: every call is dispatched fire-and-forget by the
//! engine and failures are logged at debug level and discarded. Nothing
//! here may ever affect a job's outcome.

use async_trait::async_trait;

use airwave_core::types::Credits;

/// Errors from the notification layer. Observed only in logs.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Transport(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Best-effort user notification and usage tracking.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn generation_complete(
        &self,
        user_id: &str,
        library_id: &str,
        title: &str,
    ) -> Result<(), NotifyError>;

    async fn generation_failed(&self, user_id: &str, message: &str) -> Result<(), NotifyError>;

    async fn credit_change(
        &self,
        user_id: &str,
        amount: Credits,
        description: &str,
    ) -> Result<(), NotifyError>;

    /// Auxiliary usage tracking (streaks, quests). Same best-effort rules.
    async fn track_usage(&self, user_id: &str, event: &str) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// REST implementation
// ---------------------------------------------------------------------------

/// Notifier over the notification service's REST endpoint.
pub struct RestNotifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestNotifier {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn post(
        &self,
        kind: &str,
        user_id: &str,
        data: serde_json::Value,
    ) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "user_id": user_id,
            "type": kind,
            "data": data,
        });

        let response = self
            .client
            .post(format!("{}/notifications", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RestNotifier {
    async fn generation_complete(
        &self,
        user_id: &str,
        library_id: &str,
        title: &str,
    ) -> Result<(), NotifyError> {
        self.post(
            "generation_complete",
            user_id,
            serde_json::json!({ "library_id": library_id, "title": title }),
        )
        .await
    }

    async fn generation_failed(&self, user_id: &str, message: &str) -> Result<(), NotifyError> {
        self.post(
            "generation_failed",
            user_id,
            serde_json::json!({ "message": message }),
        )
        .await
    }

    async fn credit_change(
        &self,
        user_id: &str,
        amount: Credits,
        description: &str,
    ) -> Result<(), NotifyError> {
        self.post(
            "credit_change",
            user_id,
            serde_json::json!({ "amount": amount, "description": description }),
        )
        .await
    }

    async fn track_usage(&self, user_id: &str, event: &str) -> Result<(), NotifyError> {
        self.post(
            "usage",
            user_id,
            serde_json::json!({ "event": event }),
        )
        .await
    }
}
