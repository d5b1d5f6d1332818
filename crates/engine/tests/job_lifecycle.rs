//! Lifecycle tests for the generation engine, run against fake
//! collaborators and scripted providers.
//!
//! The central property exercised throughout: every credit hold is
//! discharged by either a persisted catalog record or a refund of the same
//! amount -- never neither.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use tokio::sync::mpsc;

use airwave_core::error::CoreError;
use airwave_core::sanitize::SAFE_ERROR_MESSAGE;
use airwave_core::types::{
    Credits, DurationClass, FormatParams, GenerationRequest, RefundReason,
};
use airwave_engine::{
    ArtifactCategory, ArtifactPersister, CatalogRecord, CreditLedger, DeductOutcome, EngineConfig,
    GenerationEngine, LedgerError, Notifier, NotifyError, PersistError, StoredArtifact,
    StreamEmitter,
};
use airwave_providers::api::ProviderApiError;
use airwave_providers::{
    CoverArtProvider, JobStatus, MusicProvider, ProviderId, ProviderJobHandle, ProviderJobSpec,
    StatusUpdate,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeLedger {
    balance: Mutex<Credits>,
    deduct_calls: Mutex<Vec<Credits>>,
    refunds: Mutex<Vec<(Credits, String)>>,
    attempts: Mutex<Vec<String>>,
}

impl FakeLedger {
    fn with_balance(balance: Credits) -> Arc<Self> {
        let ledger = Self::default();
        *ledger.balance.lock().unwrap() = balance;
        Arc::new(ledger)
    }

    fn balance(&self) -> Credits {
        *self.balance.lock().unwrap()
    }

    fn refunds(&self) -> Vec<(Credits, String)> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl CreditLedger for FakeLedger {
    async fn deduct(&self, _user_id: &str, amount: Credits) -> Result<DeductOutcome, LedgerError> {
        self.deduct_calls.lock().unwrap().push(amount);
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
        description: &str,
        _metadata: serde_json::Value,
    ) -> Result<(), LedgerError> {
        self.attempts.lock().unwrap().push(description.to_string());
        Ok(())
    }
}

/// Music provider that replays a scripted status sequence. Once the script
/// is exhausted it keeps reporting `Running` so timeout paths can be
/// exercised.
struct ScriptedProvider {
    script: Mutex<VecDeque<StatusUpdate>>,
    submits: AtomicUsize,
    cancels: AtomicUsize,
    last_spec: Mutex<Option<ProviderJobSpec>>,
    fail_submit: bool,
}

impl ScriptedProvider {
    fn new(script: Vec<StatusUpdate>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            submits: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            last_spec: Mutex::new(None),
            fail_submit: false,
        })
    }
}

#[async_trait]
impl MusicProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Minimax
    }

    async fn submit(&self, spec: &ProviderJobSpec) -> Result<ProviderJobHandle, ProviderApiError> {
        if self.fail_submit {
            return Err(ProviderApiError::Api {
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }
        self.submits.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock().unwrap() = Some(spec.clone());
        Ok(ProviderJobHandle {
            job_id: "prov-1".to_string(),
            provider: self.id(),
        })
    }

    async fn status(&self, _handle: &ProviderJobHandle) -> Result<StatusUpdate, ProviderApiError> {
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(running))
    }

    async fn cancel(&self, _handle: &ProviderJobHandle) -> Result<(), ProviderApiError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakePersister {
    stored: Mutex<Vec<(String, String)>>,
    records: Mutex<Vec<CatalogRecord>>,
    fail_store: bool,
}

#[async_trait]
impl ArtifactPersister for FakePersister {
    async fn store(
        &self,
        source_url: &str,
        _user_id: &str,
        _category: ArtifactCategory,
        file_name: &str,
    ) -> Result<StoredArtifact, PersistError> {
        if self.fail_store {
            return Err(PersistError::Gateway("upload failed with status 500".into()));
        }
        self.stored
            .lock()
            .unwrap()
            .push((source_url.to_string(), file_name.to_string()));
        Ok(StoredArtifact {
            public_url: format!("https://cdn.test/{file_name}"),
        })
    }

    async fn write_catalog_record(&self, record: &CatalogRecord) -> Result<String, PersistError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(record.library_id.clone())
    }
}

#[derive(Default)]
struct FakeNotifier {
    events: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn generation_complete(
        &self,
        _user_id: &str,
        _library_id: &str,
        _title: &str,
    ) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push("complete".into());
        Ok(())
    }

    async fn generation_failed(&self, _user_id: &str, _message: &str) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push("failed".into());
        Ok(())
    }

    async fn credit_change(
        &self,
        _user_id: &str,
        _amount: Credits,
        _description: &str,
    ) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push("credit".into());
        Ok(())
    }

    async fn track_usage(&self, _user_id: &str, _event: &str) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push("usage".into());
        Ok(())
    }
}

/// Cover provider whose submit always fails.
struct BrokenCover;

#[async_trait]
impl CoverArtProvider for BrokenCover {
    async fn submit(&self, _prompt: &str, _title: &str) -> Result<ProviderJobHandle, ProviderApiError> {
        Err(ProviderApiError::Api {
            status: 500,
            body: "boom".to_string(),
        })
    }

    async fn status(&self, _handle: &ProviderJobHandle) -> Result<StatusUpdate, ProviderApiError> {
        unreachable!("submit never succeeds")
    }
}

/// Cover provider that succeeds on the first poll.
struct InstantCover;

#[async_trait]
impl CoverArtProvider for InstantCover {
    async fn submit(&self, _prompt: &str, _title: &str) -> Result<ProviderJobHandle, ProviderApiError> {
        Ok(ProviderJobHandle {
            job_id: "cover-1".to_string(),
            provider: ProviderId::Flux,
        })
    }

    async fn status(&self, _handle: &ProviderJobHandle) -> Result<StatusUpdate, ProviderApiError> {
        Ok(StatusUpdate {
            status: JobStatus::Succeeded,
            output: Some(serde_json::json!("https://img.test/cover.jpg")),
            error: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn running() -> StatusUpdate {
    StatusUpdate {
        status: JobStatus::Running,
        output: None,
        error: None,
    }
}

fn succeeded(url: &str) -> StatusUpdate {
    StatusUpdate {
        status: JobStatus::Succeeded,
        output: Some(serde_json::json!(url)),
        error: None,
    }
}

fn failed(message: &str) -> StatusUpdate {
    StatusUpdate {
        status: JobStatus::Failed,
        output: None,
        error: Some(message.to_string()),
    }
}

fn test_config() -> EngineConfig {
    EngineConfig {
        poll_interval: Duration::from_millis(1),
        max_poll_attempts: 50,
        cover_poll_attempts: 5,
        stream_buffer: 16,
    }
}

struct Harness {
    engine: Arc<GenerationEngine>,
    ledger: Arc<FakeLedger>,
    persister: Arc<FakePersister>,
    notifier: Arc<FakeNotifier>,
    provider: Arc<ScriptedProvider>,
}

fn harness(balance: Credits, script: Vec<StatusUpdate>) -> Harness {
    harness_with(balance, script, test_config(), None)
}

fn harness_with(
    balance: Credits,
    script: Vec<StatusUpdate>,
    config: EngineConfig,
    cover: Option<Arc<dyn CoverArtProvider>>,
) -> Harness {
    let ledger = FakeLedger::with_balance(balance);
    let persister = Arc::new(FakePersister::default());
    let notifier = Arc::new(FakeNotifier::default());
    let provider = ScriptedProvider::new(script);

    let engine = Arc::new(GenerationEngine::new(
        config,
        Arc::clone(&ledger) as Arc<dyn CreditLedger>,
        Arc::clone(&persister) as Arc<dyn ArtifactPersister>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        vec![Arc::clone(&provider) as Arc<dyn MusicProvider>],
        cover,
    ));

    Harness {
        engine,
        ledger,
        persister,
        notifier,
        provider,
    }
}

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest {
        user_id: "user-1".to_string(),
        title: "Test".to_string(),
        prompt: prompt.to_string(),
        lyrics: None,
        duration: DurationClass::Medium,
        language: "english".to_string(),
        format: FormatParams::default(),
        generate_cover_art: false,
    }
}

/// Drain the stream until the controller task drops the emitter.
async fn collect_events(mut rx: mpsc::Receiver<String>) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    let deadline = Duration::from_secs(5);
    loop {
        match tokio::time::timeout(deadline, rx.recv()).await {
            Ok(Some(line)) => events.push(serde_json::from_str(line.trim_end()).unwrap()),
            Ok(None) => return events,
            Err(_) => panic!("stream did not close within {deadline:?}"),
        }
    }
}

async fn run_to_completion(harness: &Harness, req: GenerationRequest) -> Vec<serde_json::Value> {
    let prepared = harness.engine.prepare(req).await.unwrap();
    let (emitter, rx) = StreamEmitter::channel(harness.engine.config().stream_buffer);
    Arc::clone(&harness.engine).spawn(prepared, emitter);
    collect_events(rx).await
}

/// Wait for a condition driven by the detached task.
async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn happy_path_deducts_persists_and_streams() {
    let h = harness(10, vec![running(), succeeded("https://out.test/a.mp3")]);

    let events = run_to_completion(&h, request("upbeat synth pop")).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "started");
    assert!(events[0]["provider_job_id"].is_string());
    assert_eq!(events[1]["type"], "result");
    assert_eq!(events[1]["success"], true);
    assert_eq!(events[1]["credits_remaining"], 8);
    assert_eq!(events[1]["credits_deducted"], 2);
    assert!(events[1]["audio_url"].as_str().unwrap().starts_with("https://cdn.test/"));

    // One deduction, one stored artifact, one catalog record, no refunds.
    assert_eq!(*h.ledger.deduct_calls.lock().unwrap(), vec![2]);
    assert_eq!(h.persister.stored.lock().unwrap().len(), 1);
    assert_eq!(h.persister.records.lock().unwrap().len(), 1);
    assert!(h.ledger.refunds().is_empty());
    assert_eq!(h.ledger.balance(), 8);
}

#[tokio::test]
async fn provider_failure_refunds_and_sanitizes() {
    let h = harness(10, vec![failed("Replicate prediction exploded: CUDA OOM")]);

    let events = run_to_completion(&h, request("upbeat synth pop")).await;

    let result = events.last().unwrap();
    assert_eq!(result["success"], false);
    // The raw provider detail never reaches the stream.
    assert_eq!(result["error"], SAFE_ERROR_MESSAGE);
    assert_eq!(result["credits_remaining"], 10);

    assert_eq!(h.ledger.refunds(), vec![(2, "provider_failed".to_string())]);
    assert_eq!(h.ledger.balance(), 10);
    assert!(h.persister.stored.lock().unwrap().is_empty());
}

#[tokio::test]
async fn submit_failure_refunds() {
    let mut h = harness(10, vec![]);
    // Rebuild with a provider that refuses submission.
    let provider = Arc::new(ScriptedProvider {
        script: Mutex::new(VecDeque::new()),
        submits: AtomicUsize::new(0),
        cancels: AtomicUsize::new(0),
        last_spec: Mutex::new(None),
        fail_submit: true,
    });
    h.engine = Arc::new(GenerationEngine::new(
        test_config(),
        Arc::clone(&h.ledger) as Arc<dyn CreditLedger>,
        Arc::clone(&h.persister) as Arc<dyn ArtifactPersister>,
        Arc::clone(&h.notifier) as Arc<dyn Notifier>,
        vec![provider as Arc<dyn MusicProvider>],
        None,
    ));

    let events = run_to_completion(&h, request("upbeat synth pop")).await;

    // No `started` event: submission never produced a handle.
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["success"], false);
    assert_eq!(h.ledger.refunds(), vec![(2, "provider_failed".to_string())]);
    assert_eq!(h.ledger.balance(), 10);
}

#[tokio::test]
async fn exhausted_attempt_budget_maps_to_timeout_refund() {
    let config = EngineConfig {
        max_poll_attempts: 3,
        ..test_config()
    };
    let h = harness_with(10, vec![running(), running(), running(), running()], config, None);

    let events = run_to_completion(&h, request("upbeat synth pop")).await;

    assert_eq!(events.last().unwrap()["success"], false);
    assert_eq!(h.ledger.refunds(), vec![(2, "timed_out".to_string())]);
    assert_eq!(h.ledger.balance(), 10);
}

#[tokio::test]
async fn insufficient_balance_rejects_before_any_submission() {
    let h = harness(1, vec![succeeded("https://out.test/a.mp3")]);

    let err = h.engine.prepare(request("upbeat synth pop")).await.unwrap_err();
    assert_matches!(err, CoreError::InsufficientCredits(_));

    // The refused attempt was deducted against, logged for audit, and
    // nothing else happened: no submission, no refund.
    assert_eq!(h.ledger.deduct_calls.lock().unwrap().len(), 1);
    assert_eq!(h.ledger.attempts.lock().unwrap().len(), 1);
    assert!(h.ledger.refunds().is_empty());
    assert_eq!(h.provider.submits.load(Ordering::SeqCst), 0);
    assert_eq!(h.ledger.balance(), 1);
}

#[tokio::test]
async fn persistence_failure_refunds_like_provider_failure() {
    let ledger = FakeLedger::with_balance(10);
    let persister = Arc::new(FakePersister {
        fail_store: true,
        ..FakePersister::default()
    });
    let notifier = Arc::new(FakeNotifier::default());
    let provider = ScriptedProvider::new(vec![succeeded("https://out.test/a.mp3")]);
    let engine = Arc::new(GenerationEngine::new(
        test_config(),
        Arc::clone(&ledger) as Arc<dyn CreditLedger>,
        Arc::clone(&persister) as Arc<dyn ArtifactPersister>,
        notifier as Arc<dyn Notifier>,
        vec![Arc::clone(&provider) as Arc<dyn MusicProvider>],
        None,
    ));

    let prepared = engine.prepare(request("upbeat synth pop")).await.unwrap();
    let (emitter, rx) = StreamEmitter::channel(16);
    Arc::clone(&engine).spawn(prepared, emitter);
    let events = collect_events(rx).await;

    let result = events.last().unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], SAFE_ERROR_MESSAGE);
    assert_eq!(ledger.refunds(), vec![(2, "persistence_failed".to_string())]);
    assert_eq!(ledger.balance(), 10);
    assert!(persister.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn caller_disconnect_does_not_change_the_outcome() {
    let h = harness(
        10,
        vec![running(), running(), succeeded("https://out.test/a.mp3")],
    );

    let prepared = h.engine.prepare(request("upbeat synth pop")).await.unwrap();
    let (emitter, rx) = StreamEmitter::channel(16);
    Arc::clone(&h.engine).spawn(prepared, emitter);
    // Caller walks away mid-poll.
    drop(rx);

    // The job still completes and persists.
    let persister = Arc::clone(&h.persister);
    wait_for(move || !persister.records.lock().unwrap().is_empty()).await;

    assert!(h.ledger.refunds().is_empty());
    assert_eq!(h.ledger.balance(), 8);
}

#[tokio::test]
async fn explicit_cancel_refunds_with_cancel_tag() {
    let config = EngineConfig {
        max_poll_attempts: 10_000,
        poll_interval: Duration::from_millis(5),
        ..test_config()
    };
    let h = harness_with(10, vec![], config, None);

    let prepared = h.engine.prepare(request("upbeat synth pop")).await.unwrap();
    let (emitter, mut rx) = StreamEmitter::channel(16);
    let job_id = Arc::clone(&h.engine).spawn(prepared, emitter);

    // Wait for the started event, then cancel explicitly.
    let started = rx.recv().await.unwrap();
    assert!(started.contains("started"));
    h.engine.cancel("user-1", job_id).unwrap();

    let events = collect_events(rx).await;
    let result = events.last().unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "Generation canceled, credits refunded");

    assert_eq!(h.ledger.refunds(), vec![(2, "canceled".to_string())]);
    assert_eq!(h.ledger.balance(), 10);
    assert_eq!(h.provider.cancels.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_checks_ownership() {
    let config = EngineConfig {
        max_poll_attempts: 10_000,
        ..test_config()
    };
    let h = harness_with(10, vec![], config, None);

    let prepared = h.engine.prepare(request("upbeat synth pop")).await.unwrap();
    let (emitter, rx) = StreamEmitter::channel(16);
    let job_id = Arc::clone(&h.engine).spawn(prepared, emitter);

    assert_matches!(
        h.engine.cancel("someone-else", job_id),
        Err(CoreError::Forbidden(_))
    );

    // Clean up: cancel as the owner and drain.
    h.engine.cancel("user-1", job_id).unwrap();
    collect_events(rx).await;
}

#[tokio::test]
async fn bonus_pack_quota_rejects_second_same_day_request() {
    let h = harness(
        10,
        vec![
            succeeded("https://out.test/a.mp3"),
            succeeded("https://out.test/b.mp3"),
        ],
    );

    let events = run_to_completion(&h, request("play the airwave anthem please")).await;
    assert_eq!(events.last().unwrap()["success"], true);

    let err = h
        .engine
        .prepare(request("play the airwave anthem please"))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Quota(_));

    // Only the first request ever reached the ledger.
    assert_eq!(h.ledger.deduct_calls.lock().unwrap().len(), 1);
    assert_eq!(h.ledger.balance(), 8);
}

#[tokio::test]
async fn bonus_pack_resolves_branded_lyrics() {
    let h = harness(10, vec![succeeded("https://out.test/a.mp3")]);

    run_to_completion(&h, request("play the airwave anthem please")).await;

    let spec = h.provider.last_spec.lock().unwrap().clone().unwrap();
    assert!(spec.lyrics.contains("Airwave"));
}

#[tokio::test]
async fn failed_cover_subjob_never_touches_the_primary_result() {
    let h = harness_with(
        10,
        vec![succeeded("https://out.test/a.mp3")],
        test_config(),
        Some(Arc::new(BrokenCover)),
    );

    let mut req = request("upbeat synth pop");
    req.generate_cover_art = true;
    let events = run_to_completion(&h, req).await;

    // Primary result is a success despite the broken cover.
    assert_eq!(events.last().unwrap()["success"], true);

    // Primary hold intact; only the cover's own deduction was refunded.
    assert_eq!(*h.ledger.deduct_calls.lock().unwrap(), vec![2, 1]);
    assert_eq!(h.ledger.refunds(), vec![(1, "provider_failed".to_string())]);
    assert_eq!(h.ledger.balance(), 8);
}

#[tokio::test]
async fn successful_cover_subjob_stores_the_image() {
    let h = harness_with(
        10,
        vec![succeeded("https://out.test/a.mp3")],
        test_config(),
        Some(Arc::new(InstantCover)),
    );

    let mut req = request("upbeat synth pop");
    req.generate_cover_art = true;
    let events = run_to_completion(&h, req).await;
    assert_eq!(events.last().unwrap()["success"], true);

    let stored = h.persister.stored.lock().unwrap().clone();
    assert_eq!(stored.len(), 2, "audio and cover image");
    assert!(stored[1].1.ends_with("-cover.jpg"));
    assert_eq!(h.ledger.balance(), 7);
    assert!(h.ledger.refunds().is_empty());
}

#[tokio::test]
async fn every_hold_is_discharged_across_mixed_outcomes() {
    // One success followed by one failure on the same engine.
    let h = harness(
        10,
        vec![
            succeeded("https://out.test/a.mp3"),
            failed("second one dies"),
        ],
    );

    let first = run_to_completion(&h, request("upbeat synth pop")).await;
    assert_eq!(first.last().unwrap()["success"], true);

    let second = run_to_completion(&h, request("dreamy lofi beat")).await;
    assert_eq!(second.last().unwrap()["success"], false);

    // Ledger safety: deduct count == catalog records + refunds.
    let deducts = h.ledger.deduct_calls.lock().unwrap().len();
    let records = h.persister.records.lock().unwrap().len();
    let refunds = h.ledger.refunds().len();
    assert_eq!(deducts, records + refunds);
    assert_eq!(h.ledger.balance(), 8);
}
