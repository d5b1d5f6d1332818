//! The job controller.
//!
//! Lifecycle: `Created -> CreditHeld -> Submitted -> Polling ->
//! {Succeeded | Failed | Canceled | TimedOut} -> Persisted | Refunded`.
//!
//! [`GenerationEngine::prepare`] covers `Created -> CreditHeld` and runs
//! synchronously so quota and balance rejections reach the caller before
//! the stream opens. [`GenerationEngine::spawn`] detaches the rest onto
//! its own task with its own cancellation token: the HTTP connection's
//! lifetime only affects the stream writer, never the job.
//!
//! The one correctness invariant everything here serves: a credit hold is
//! always discharged, by a persisted artifact or by a refund -- never
//! neither.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use airwave_core::error::CoreError;
use airwave_core::lyrics;
use airwave_core::pricing::GenerationKind;
use airwave_core::sanitize::{sanitize_credit_error, sanitize_error};
use airwave_core::track_id::generate_library_id;
use airwave_core::types::{
    AudioFormat, CreditHold, GenerationRequest, GenerationResult, RefundReason,
};
use airwave_providers::output::extract_output_url;
use airwave_providers::{
    route, CoverArtProvider, JobStatus, MusicProvider, ProviderId, ProviderJobSpec,
};

use crate::config::EngineConfig;
use crate::ledger::CreditLedger;
use crate::notify::Notifier;
use crate::persist::{ArtifactCategory, ArtifactPersister, CatalogRecord};
use crate::quota::BonusQuota;
use crate::registry::JobRegistry;
use crate::stream::{StreamEmitter, StreamEvent};

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Lifecycle states of one generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    CreditHeld,
    Submitted,
    Polling,
    Succeeded,
    Failed,
    Canceled,
    TimedOut,
    Persisted,
    Refunded,
}

/// A request that has passed validation, content resolution, the bonus
/// quota, and the credit deduction. Everything after this point happens on
/// the detached controller task.
#[derive(Debug)]
pub struct PreparedJob {
    pub job_id: Uuid,
    pub request: GenerationRequest,
    /// Resolved lyrics, within provider bounds.
    pub lyrics: String,
    /// Routing decision; made once, never revisited.
    pub provider: ProviderId,
    pub hold: CreditHold,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the collaborators and drives every generation job.
pub struct GenerationEngine {
    config: EngineConfig,
    ledger: Arc<dyn CreditLedger>,
    persister: Arc<dyn ArtifactPersister>,
    notifier: Arc<dyn Notifier>,
    music_providers: HashMap<ProviderId, Arc<dyn MusicProvider>>,
    cover_provider: Option<Arc<dyn CoverArtProvider>>,
    quota: BonusQuota,
    registry: JobRegistry,
}

impl GenerationEngine {
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn CreditLedger>,
        persister: Arc<dyn ArtifactPersister>,
        notifier: Arc<dyn Notifier>,
        music_providers: Vec<Arc<dyn MusicProvider>>,
        cover_provider: Option<Arc<dyn CoverArtProvider>>,
    ) -> Self {
        let music_providers = music_providers
            .into_iter()
            .map(|p| (p.id(), p))
            .collect();
        Self {
            config,
            ledger,
            persister,
            notifier,
            music_providers,
            cover_provider,
            quota: BonusQuota::new(),
            registry: JobRegistry::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `Created -> CreditHeld`: resolve content, enforce the bonus quota,
    /// route, and deduct. Every rejection here happens before any external
    /// submission and before the stream opens; a refused deduction still
    /// produces an audit row.
    pub async fn prepare(&self, request: GenerationRequest) -> Result<PreparedJob, CoreError> {
        let use_branded =
            request.lyrics.is_none() && lyrics::wants_branded_pack(&request.prompt);
        if use_branded && !self.quota.try_claim(&request.user_id) {
            return Err(CoreError::Quota(
                "Today's bonus track is already used, come back tomorrow".to_string(),
            ));
        }

        let resolved = lyrics::resolve(
            &request.prompt,
            request.lyrics.as_deref(),
            request.duration,
            use_branded,
        );
        let provider = route(&request.language, &resolved);
        let price = GenerationKind::Song.price();

        let outcome = match self.ledger.deduct(&request.user_id, price).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if use_branded {
                    self.quota.release(&request.user_id);
                }
                tracing::error!(user_id = %request.user_id, error = %e, "Deduct call failed");
                return Err(CoreError::Internal(
                    "credit deduction unavailable".to_string(),
                ));
            }
        };

        if !outcome.success {
            if use_branded {
                self.quota.release(&request.user_id);
            }
            // Audit row even though no money moved.
            let _ = self
                .ledger
                .log_attempt(
                    &request.user_id,
                    -price,
                    &format!("Music generation: {}", request.title),
                    serde_json::json!({
                        "prompt": request.prompt,
                        "status": "rejected",
                        "reason": outcome.error_message,
                    }),
                )
                .await;
            return Err(CoreError::InsufficientCredits(sanitize_credit_error(
                outcome.error_message.as_deref(),
            )));
        }

        let job_id = Uuid::new_v4();
        tracing::info!(
            job_id = %job_id,
            user_id = %request.user_id,
            price,
            balance = outcome.new_balance,
            provider = %provider,
            "Credits deducted, job prepared",
        );

        Ok(PreparedJob {
            job_id,
            request,
            lyrics: resolved,
            provider,
            hold: CreditHold {
                amount: price,
                balance_after: outcome.new_balance,
                transaction_id: Uuid::new_v4(),
            },
        })
    }

    /// Detach the controller onto its own task. The returned id addresses
    /// the explicit cancel endpoint; the task outlives the HTTP request.
    pub fn spawn(self: Arc<Self>, prepared: PreparedJob, emitter: StreamEmitter) -> Uuid {
        let job_id = prepared.job_id;
        let token = CancellationToken::new();
        self.registry
            .register(job_id, prepared.request.user_id.clone(), token.clone());

        let engine = self;
        tokio::spawn(async move {
            engine.run(prepared, emitter, token).await;
            engine.registry.remove(job_id);
        });

        job_id
    }

    /// Explicit, affirmative cancellation. Distinct from disconnection:
    /// only this moves a job to `Canceled`.
    pub fn cancel(&self, user_id: &str, job_id: Uuid) -> Result<(), CoreError> {
        self.registry.cancel(user_id, job_id)
    }

    // -----------------------------------------------------------------------
    // Controller task
    // -----------------------------------------------------------------------

    async fn run(&self, prepared: PreparedJob, emitter: StreamEmitter, cancel: CancellationToken) {
        let PreparedJob {
            job_id,
            request,
            lyrics,
            provider,
            hold,
        } = prepared;
        let mut state = JobState::CreditHeld;

        let Some(music) = self.music_providers.get(&provider) else {
            self.finish_failure(
                job_id,
                &request,
                &hold,
                &emitter,
                &mut state,
                RefundReason::ProviderFailed,
                &format!("no adapter configured for provider {provider}"),
            )
            .await;
            return;
        };

        // -- CreditHeld -> Submitted --
        let spec = ProviderJobSpec {
            prompt: request.prompt.clone(),
            lyrics: lyrics.clone(),
            language: request.language.clone(),
            duration: request.duration,
            format: request.format,
        };
        let handle = match music.submit(&spec).await {
            Ok(handle) => handle,
            Err(e) => {
                self.finish_failure(
                    job_id,
                    &request,
                    &hold,
                    &emitter,
                    &mut state,
                    RefundReason::ProviderFailed,
                    &e.to_string(),
                )
                .await;
                return;
            }
        };
        transition(job_id, &mut state, JobState::Submitted);

        emitter
            .emit(StreamEvent::Started {
                job_id,
                provider_job_id: handle.job_id.clone(),
            })
            .await;

        // -- Submitted -> Polling -> terminal --
        transition(job_id, &mut state, JobState::Polling);
        let mut last_status = JobStatus::Submitted;
        let mut output = None;
        let mut provider_error = None;
        let mut canceled = false;
        let mut disconnect_noted = false;

        for attempt in 0..self.config.max_poll_attempts {
            if cancel.is_cancelled() {
                canceled = true;
                if let Err(e) = music.cancel(&handle).await {
                    tracing::warn!(job_id = %job_id, error = %e, "Provider-side cancel failed");
                }
                break;
            }

            tokio::time::sleep(self.config.poll_interval).await;

            // Disconnection is observed, logged once, and otherwise
            // ignored: the job runs to completion so the result can still
            // be saved for the user.
            if emitter.is_disconnected() && !disconnect_noted {
                disconnect_noted = true;
                tracing::info!(job_id = %job_id, "Caller disconnected, continuing in background");
            }

            match music.status(&handle).await {
                Ok(update) => {
                    last_status = update.status;
                    output = update.output;
                    provider_error = update.error;
                    if last_status.is_terminal() {
                        break;
                    }
                }
                Err(e) => {
                    // A failed poll consumes an attempt; the budget bounds
                    // the loop either way.
                    tracing::warn!(job_id = %job_id, attempt, error = %e, "Status poll failed");
                }
            }
        }

        let terminal = if canceled {
            JobStatus::Canceled
        } else if last_status.is_terminal() {
            last_status
        } else {
            JobStatus::TimedOut
        };

        match terminal {
            JobStatus::Succeeded => {
                transition(job_id, &mut state, JobState::Succeeded);
                self.finish_success(job_id, &request, &hold, &emitter, &mut state, provider, &lyrics, output)
                    .await;
            }
            JobStatus::Canceled => {
                transition(job_id, &mut state, JobState::Canceled);
                self.finish_failure(
                    job_id,
                    &request,
                    &hold,
                    &emitter,
                    &mut state,
                    RefundReason::Canceled,
                    "canceled by user",
                )
                .await;
            }
            JobStatus::TimedOut => {
                transition(job_id, &mut state, JobState::TimedOut);
                self.finish_failure(
                    job_id,
                    &request,
                    &hold,
                    &emitter,
                    &mut state,
                    RefundReason::TimedOut,
                    "generation did not reach a terminal state within the attempt budget",
                )
                .await;
            }
            _ => {
                transition(job_id, &mut state, JobState::Failed);
                let detail = provider_error.unwrap_or_else(|| "generation failed".to_string());
                self.finish_failure(
                    job_id,
                    &request,
                    &hold,
                    &emitter,
                    &mut state,
                    RefundReason::ProviderFailed,
                    &detail,
                )
                .await;
            }
        }
    }

    /// `Succeeded -> Persisted`: normalize the output, store the artifact,
    /// write the catalog record, emit the final event, then attempt the
    /// isolated cover-art sub-job. Persistence failure is a terminal
    /// failure requiring a refund even though the provider succeeded.
    #[allow(clippy::too_many_arguments)]
    async fn finish_success(
        &self,
        job_id: Uuid,
        request: &GenerationRequest,
        hold: &CreditHold,
        emitter: &StreamEmitter,
        state: &mut JobState,
        provider: ProviderId,
        lyrics: &str,
        output: Option<serde_json::Value>,
    ) {
        let source_url = output.as_ref().and_then(extract_output_url);
        let Some(source_url) = source_url else {
            self.finish_failure(
                job_id,
                request,
                hold,
                emitter,
                state,
                RefundReason::ProviderFailed,
                "provider reported success with no artifact in output",
            )
            .await;
            return;
        };

        let file_name = artifact_file_name(&request.title, request.format.audio_format);
        let stored = match self
            .persister
            .store(&source_url, &request.user_id, ArtifactCategory::Music, &file_name)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                self.finish_failure(
                    job_id,
                    request,
                    hold,
                    emitter,
                    state,
                    RefundReason::PersistenceFailed,
                    &e.to_string(),
                )
                .await;
                return;
            }
        };

        let record = CatalogRecord {
            library_id: generate_library_id(&request.user_id),
            user_id: request.user_id.clone(),
            title: request.title.clone(),
            prompt: request.prompt.clone(),
            lyrics: lyrics.to_string(),
            artifact_url: stored.public_url.clone(),
            audio_format: request.format.audio_format.as_str().to_string(),
            bitrate: request.format.bitrate,
            sample_rate: request.format.sample_rate,
            provider: provider.as_str().to_string(),
            language: request.language.clone(),
        };
        let library_id = match self.persister.write_catalog_record(&record).await {
            Ok(id) => id,
            Err(e) => {
                self.finish_failure(
                    job_id,
                    request,
                    hold,
                    emitter,
                    state,
                    RefundReason::PersistenceFailed,
                    &e.to_string(),
                )
                .await;
                return;
            }
        };
        transition(job_id, state, JobState::Persisted);

        // The value that discharges the credit hold without a refund.
        let result = GenerationResult {
            artifact_url: stored.public_url,
            provider: provider.as_str().to_string(),
            language: request.language.clone(),
            audio_format: request.format.audio_format,
            credits_deducted: hold.amount,
            library_id: library_id.clone(),
        };

        tracing::info!(
            job_id = %job_id,
            library_id = %library_id,
            url = %result.artifact_url,
            "Generation persisted",
        );

        emitter
            .emit(StreamEvent::success(&result, request.title.clone(), hold.balance_after))
            .await;

        // Best-effort side calls; outcomes discarded.
        {
            let notifier = Arc::clone(&self.notifier);
            let user = request.user_id.clone();
            let title = request.title.clone();
            let library = library_id.clone();
            let amount = hold.amount;
            tokio::spawn(async move {
                if let Err(e) = notifier.generation_complete(&user, &library, &title).await {
                    tracing::debug!(error = %e, "Completion notification dropped");
                }
                if let Err(e) = notifier
                    .credit_change(&user, -amount, &format!("Music generation: {title}"))
                    .await
                {
                    tracing::debug!(error = %e, "Credit notification dropped");
                }
                if let Err(e) = notifier.track_usage(&user, "generate_songs").await {
                    tracing::debug!(error = %e, "Usage tracking dropped");
                }
            });
        }

        // Isolated sub-job; only after Persisted, never affects the
        // primary outcome.
        if request.generate_cover_art {
            self.run_cover_subjob(job_id, request, &library_id).await;
        }
    }

    /// Terminal failure path: refund the full hold (tagged with the reason
    /// and audit metadata), emit a sanitized terminal event, notify.
    #[allow(clippy::too_many_arguments)]
    async fn finish_failure(
        &self,
        job_id: Uuid,
        request: &GenerationRequest,
        hold: &CreditHold,
        emitter: &StreamEmitter,
        state: &mut JobState,
        reason: RefundReason,
        detail: &str,
    ) {
        tracing::error!(
            job_id = %job_id,
            user_id = %request.user_id,
            reason = reason.as_str(),
            detail,
            "Generation failed, refunding",
        );

        let metadata = serde_json::json!({
            "prompt": request.prompt,
            "title": request.title,
            "transaction_id": hold.transaction_id,
            "detail": truncate(detail, 200),
        });
        self.refund_with_retry(&request.user_id, hold.amount, reason, metadata)
            .await;
        transition(job_id, state, JobState::Refunded);

        // The user-facing message never carries internal detail.
        let message = if reason == RefundReason::Canceled {
            "Generation canceled, credits refunded".to_string()
        } else {
            sanitize_error(detail).to_string()
        };
        let restored_balance = hold.balance_after + hold.amount;
        emitter
            .emit(StreamEvent::failure(message.clone(), restored_balance))
            .await;

        let notifier = Arc::clone(&self.notifier);
        let user = request.user_id.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.generation_failed(&user, &message).await {
                tracing::debug!(error = %e, "Failure notification dropped");
            }
        });
    }

    /// Refunds must not be lost: retry with backoff before giving up, and
    /// scream in the logs if the hold is left undischarged.
    async fn refund_with_retry(
        &self,
        user_id: &str,
        amount: airwave_core::types::Credits,
        reason: RefundReason,
        metadata: serde_json::Value,
    ) {
        const MAX_RETRIES: u32 = 2;
        for attempt in 0..=MAX_RETRIES {
            match self
                .ledger
                .refund(user_id, amount, reason, metadata.clone())
                .await
            {
                Ok(()) => return,
                Err(e) => {
                    tracing::error!(user_id, attempt, error = %e, "Refund attempt failed");
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt + 1)))
                            .await;
                    }
                }
            }
        }
        tracing::error!(
            user_id,
            amount,
            reason = reason.as_str(),
            "Refund exhausted retries, credit hold undischarged",
        );
    }

    // -----------------------------------------------------------------------
    // Cover-art sub-job
    // -----------------------------------------------------------------------

    /// Runs only after the primary job is `Persisted`. Bills its own price
    /// (skipped if the balance no longer covers it) and swallows every
    /// failure: a broken cover never rolls back or refunds the song.
    async fn run_cover_subjob(&self, job_id: Uuid, request: &GenerationRequest, library_id: &str) {
        let Some(cover) = self.cover_provider.as_ref() else {
            return;
        };

        let price = GenerationKind::CoverArt.price();
        let outcome = match self.ledger.deduct(&request.user_id, price).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Cover art deduct call failed, skipping");
                return;
            }
        };
        if !outcome.success {
            tracing::info!(job_id = %job_id, "Skipping cover art, balance no longer covers it");
            return;
        }

        match self.generate_cover(cover.as_ref(), request).await {
            Ok(cover_url) => {
                tracing::info!(job_id = %job_id, library_id, url = %cover_url, "Cover art stored");
                let notifier = Arc::clone(&self.notifier);
                let user = request.user_id.clone();
                let title = request.title.clone();
                tokio::spawn(async move {
                    if let Err(e) = notifier
                        .credit_change(&user, -price, &format!("Cover art: {title}"))
                        .await
                    {
                        tracing::debug!(error = %e, "Credit notification dropped");
                    }
                });
            }
            Err(detail) => {
                tracing::warn!(job_id = %job_id, library_id, detail = %detail, "Cover art sub-job failed");
                // The sub-job's own hold still gets discharged.
                self.refund_with_retry(
                    &request.user_id,
                    price,
                    RefundReason::ProviderFailed,
                    serde_json::json!({
                        "subjob": "cover_art",
                        "library_id": library_id,
                        "detail": truncate(&detail, 200),
                    }),
                )
                .await;
            }
        }
    }

    async fn generate_cover(
        &self,
        cover: &dyn CoverArtProvider,
        request: &GenerationRequest,
    ) -> Result<String, String> {
        let handle = cover
            .submit(&request.prompt, &request.title)
            .await
            .map_err(|e| e.to_string())?;

        let mut output = None;
        for _ in 0..self.config.cover_poll_attempts {
            tokio::time::sleep(self.config.poll_interval).await;
            match cover.status(&handle).await {
                Ok(update) => match update.status {
                    JobStatus::Succeeded => {
                        output = update.output;
                        break;
                    }
                    JobStatus::Failed | JobStatus::Canceled => {
                        return Err(update
                            .error
                            .unwrap_or_else(|| "cover generation failed".to_string()));
                    }
                    _ => {}
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Cover status poll failed");
                }
            }
        }

        let output = output.ok_or_else(|| "cover generation timed out".to_string())?;
        let source_url =
            extract_output_url(&output).ok_or_else(|| "no image in cover output".to_string())?;

        let file_name = cover_file_name(&request.title);
        let stored = self
            .persister
            .store(
                &source_url,
                &request.user_id,
                ArtifactCategory::Images,
                &file_name,
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(stored.public_url)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn transition(job_id: Uuid, state: &mut JobState, next: JobState) {
    tracing::debug!(job_id = %job_id, from = ?*state, to = ?next, "Job state transition");
    *state = next;
}

/// File name for the stored audio artifact: slugged title + extension.
/// The persister adds the user/category/timestamp prefix.
fn artifact_file_name(title: &str, format: AudioFormat) -> String {
    format!("{}.{}", slug(title), format.extension())
}

fn cover_file_name(title: &str) -> String {
    format!("{}-cover.jpg", slug(title))
}

fn slug(title: &str) -> String {
    title
        .chars()
        .take(30)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
