//! Artifact persistence collaborator.
//!
//! Provider output URLs are ephemeral. The persister downloads the binary
//! and places it behind a stable public URL, then writes a catalog record
//! so the artifact appears in the user's library. Only after both steps is
//! a generation considered durably stored.

use async_trait::async_trait;
use serde::Serialize;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Storage request failed: {0}")]
    Transport(String),

    #[error("Storage gateway error: {0}")]
    Gateway(String),
}

/// Top-level folder an artifact is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactCategory {
    Music,
    Images,
}

impl ArtifactCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactCategory::Music => "music",
            ArtifactCategory::Images => "images",
        }
    }
}

/// A durably stored artifact.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    /// Stable public URL of the stored binary.
    pub public_url: String,
}

/// Catalog entry written after the artifact is stored.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogRecord {
    pub library_id: String,
    pub user_id: String,
    pub title: String,
    pub prompt: String,
    pub lyrics: String,
    pub artifact_url: String,
    pub audio_format: String,
    pub bitrate: u32,
    pub sample_rate: u32,
    pub provider: String,
    pub language: String,
}

/// Durable storage operations.
#[async_trait]
pub trait ArtifactPersister: Send + Sync {
    /// Download `source_url` and store it under the user's folder.
    async fn store(
        &self,
        source_url: &str,
        user_id: &str,
        category: ArtifactCategory,
        file_name: &str,
    ) -> Result<StoredArtifact, PersistError>;

    /// Write the catalog record; returns the stored library id.
    async fn write_catalog_record(&self, record: &CatalogRecord) -> Result<String, PersistError>;
}

// ---------------------------------------------------------------------------
// REST implementation
// ---------------------------------------------------------------------------

/// Persister over an S3-compatible storage gateway plus a catalog REST
/// endpoint. Keys follow `users/{user}/{category}/{timestamp}-{file}`.
pub struct ObjectStorePersister {
    client: reqwest::Client,
    gateway_url: String,
    public_base_url: String,
    catalog_url: String,
    api_key: String,
}

impl ObjectStorePersister {
    pub fn new(
        gateway_url: String,
        public_base_url: String,
        catalog_url: String,
        api_key: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url,
            public_base_url,
            catalog_url,
            api_key,
        }
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(
        client: reqwest::Client,
        gateway_url: String,
        public_base_url: String,
        catalog_url: String,
        api_key: String,
    ) -> Self {
        Self {
            client,
            gateway_url,
            public_base_url,
            catalog_url,
            api_key,
        }
    }

    /// Object key for one artifact.
    fn object_key(user_id: &str, category: ArtifactCategory, file_name: &str) -> String {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let sanitized = sanitize_file_name(file_name);
        format!("users/{user_id}/{}/{timestamp}-{sanitized}", category.as_str())
    }
}

/// Keep only characters that are safe in object keys.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl ArtifactPersister for ObjectStorePersister {
    async fn store(
        &self,
        source_url: &str,
        user_id: &str,
        category: ArtifactCategory,
        file_name: &str,
    ) -> Result<StoredArtifact, PersistError> {
        // Download from the provider's ephemeral URL.
        let download = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|e| PersistError::Transport(e.to_string()))?;
        if !download.status().is_success() {
            return Err(PersistError::Gateway(format!(
                "download failed with status {}",
                download.status()
            )));
        }
        let bytes = download
            .bytes()
            .await
            .map_err(|e| PersistError::Transport(e.to_string()))?;

        // Upload to the storage gateway.
        let key = Self::object_key(user_id, category, file_name);
        let upload = self
            .client
            .put(format!("{}/{key}", self.gateway_url))
            .bearer_auth(&self.api_key)
            .body(bytes)
            .send()
            .await
            .map_err(|e| PersistError::Transport(e.to_string()))?;
        if !upload.status().is_success() {
            return Err(PersistError::Gateway(format!(
                "upload failed with status {}",
                upload.status()
            )));
        }

        Ok(StoredArtifact {
            public_url: format!("{}/{key}", self.public_base_url),
        })
    }

    async fn write_catalog_record(&self, record: &CatalogRecord) -> Result<String, PersistError> {
        let response = self
            .client
            .post(format!("{}/records", self.catalog_url))
            .bearer_auth(&self.api_key)
            .json(record)
            .send()
            .await
            .map_err(|e| PersistError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PersistError::Gateway(format!(
                "catalog insert failed with status {}",
                response.status()
            )));
        }

        #[derive(serde::Deserialize)]
        struct Inserted {
            id: String,
        }
        let inserted: Inserted = response
            .json()
            .await
            .map_err(|e| PersistError::Transport(e.to_string()))?;
        Ok(inserted.id)
    }
}
