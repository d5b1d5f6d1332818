//! Shared test harness: the real router and engine wired to fake
//! collaborators, mirroring the construction in `main.rs` minus the
//! network-facing middleware.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use airwave_api::config::{
    LedgerConfig, NotifierConfig, PredictionsConfig, ServerConfig, StorageConfig,
};
use airwave_api::routes;
use airwave_api::state::AppState;
use airwave_core::types::{Credits, RefundReason};
use airwave_engine::{
    ArtifactCategory, ArtifactPersister, CatalogRecord, CreditLedger, DeductOutcome, EngineConfig,
    GenerationEngine, LedgerError, Notifier, NotifyError, PersistError, StoredArtifact,
};
use airwave_providers::api::ProviderApiError;
use airwave_providers::{
    JobStatus, MusicProvider, ProviderId, ProviderJobHandle, ProviderJobSpec, StatusUpdate,
};

// ---------------------------------------------------------------------------
// Fake collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeLedger {
    pub balance: Mutex<Credits>,
    pub refunds: Mutex<Vec<(Credits, String)>>,
}

#[async_trait]
impl CreditLedger for FakeLedger {
    async fn deduct(&self, _user_id: &str, amount: Credits) -> Result<DeductOutcome, LedgerError> {
        let mut balance = self.balance.lock().unwrap();
        if *balance >= amount {
            *balance -= amount;
            Ok(DeductOutcome {
                success: true,
                new_balance: *balance,
                error_message: None,
            })
        } else {
            Ok(DeductOutcome {
                success: false,
                new_balance: *balance,
                error_message: Some("Insufficient credits".to_string()),
            })
        }
    }

    async fn refund(
        &self,
        _user_id: &str,
        amount: Credits,
        reason: RefundReason,
        _metadata: serde_json::Value,
    ) -> Result<(), LedgerError> {
        *self.balance.lock().unwrap() += amount;
        self.refunds
            .lock()
            .unwrap()
            .push((amount, reason.as_str().to_string()));
        Ok(())
    }

    async fn log_attempt(
        &self,
        _user_id: &str,
        _amount: Credits,
        _description: &str,
        _metadata: serde_json::Value,
    ) -> Result<(), LedgerError> {
        Ok(())
    }
}

pub struct ScriptedProvider {
    script: Mutex<VecDeque<StatusUpdate>>,
    pub submits: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Vec<StatusUpdate>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            submits: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MusicProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Minimax
    }

    async fn submit(&self, _spec: &ProviderJobSpec) -> Result<ProviderJobHandle, ProviderApiError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderJobHandle {
            job_id: "prov-1".to_string(),
            provider: self.id(),
        })
    }

    async fn status(&self, _handle: &ProviderJobHandle) -> Result<StatusUpdate, ProviderApiError> {
        Ok(self.script.lock().unwrap().pop_front().unwrap_or(StatusUpdate {
            status: JobStatus::Running,
            output: None,
            error: None,
        }))
    }

    async fn cancel(&self, _handle: &ProviderJobHandle) -> Result<(), ProviderApiError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePersister {
    pub records: Mutex<Vec<CatalogRecord>>,
}

#[async_trait]
impl ArtifactPersister for FakePersister {
    async fn store(
        &self,
        _source_url: &str,
        _user_id: &str,
        _category: ArtifactCategory,
        file_name: &str,
    ) -> Result<StoredArtifact, PersistError> {
        Ok(StoredArtifact {
            public_url: format!("https://cdn.test/{file_name}"),
        })
    }

    async fn write_catalog_record(&self, record: &CatalogRecord) -> Result<String, PersistError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(record.library_id.clone())
    }
}

pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn generation_complete(
        &self,
        _user_id: &str,
        _library_id: &str,
        _title: &str,
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn generation_failed(&self, _user_id: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn credit_change(
        &self,
        _user_id: &str,
        _amount: Credits,
        _description: &str,
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn track_usage(&self, _user_id: &str, _event: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub app: Router,
    pub ledger: Arc<FakeLedger>,
    pub persister: Arc<FakePersister>,
    pub provider: Arc<ScriptedProvider>,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        predictions: PredictionsConfig {
            api_url: "http://predictions.test".to_string(),
            api_key: String::new(),
            minimax_model: "minimax/music-1.5".to_string(),
            acestep_model: "ace-step/ace-step-v1-3.5b".to_string(),
            cover_model: "black-forest-labs/flux-schnell".to_string(),
        },
        ledger: LedgerConfig {
            api_url: "http://ledger.test".to_string(),
            api_key: String::new(),
        },
        storage: StorageConfig {
            gateway_url: "http://storage.test".to_string(),
            public_base_url: "http://storage.test/public".to_string(),
            catalog_url: "http://catalog.test".to_string(),
            api_key: String::new(),
        },
        notifier: NotifierConfig {
            api_url: "http://notify.test".to_string(),
            api_key: String::new(),
        },
    }
}

/// Build the application router over an engine wired to fakes: a ledger
/// seeded with `balance` and a music provider replaying `script`.
pub fn build_test_app(balance: Credits, script: Vec<StatusUpdate>) -> TestApp {
    let ledger = Arc::new(FakeLedger::default());
    *ledger.balance.lock().unwrap() = balance;
    let persister = Arc::new(FakePersister::default());
    let provider = ScriptedProvider::new(script);

    let engine = Arc::new(GenerationEngine::new(
        EngineConfig {
            poll_interval: Duration::from_millis(1),
            max_poll_attempts: 20,
            cover_poll_attempts: 5,
            stream_buffer: 16,
        },
        Arc::clone(&ledger) as Arc<dyn CreditLedger>,
        Arc::clone(&persister) as Arc<dyn ArtifactPersister>,
        Arc::new(NullNotifier) as Arc<dyn Notifier>,
        vec![Arc::clone(&provider) as Arc<dyn MusicProvider>],
        None,
    ));

    let state = AppState {
        engine,
        config: Arc::new(test_config()),
    };

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .with_state(state);

    TestApp {
        app,
        ledger,
        persister,
        provider,
    }
}

// ---------------------------------------------------------------------------
// Request / response helpers
// ---------------------------------------------------------------------------

pub fn scripted_success(url: &str) -> Vec<StatusUpdate> {
    vec![
        StatusUpdate {
            status: JobStatus::Running,
            output: None,
            error: None,
        },
        StatusUpdate {
            status: JobStatus::Succeeded,
            output: Some(serde_json::json!(url)),
            error: None,
        },
    ]
}

pub fn scripted_failure(message: &str) -> Vec<StatusUpdate> {
    vec![StatusUpdate {
        status: JobStatus::Failed,
        output: None,
        error: Some(message.to_string()),
    }]
}

/// POST a JSON body, optionally as an identified user.
pub async fn post_json(
    app: Router,
    uri: &str,
    user: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }

    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Collect the full response body as one JSON value.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect an NDJSON response body into one JSON value per line.
pub async fn body_lines(response: Response<Body>) -> Vec<serde_json::Value> {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// A well-formed generation request body.
pub fn generation_body(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "title": "Test",
        "prompt": prompt,
        "duration": "medium",
    })
}
