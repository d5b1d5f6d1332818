//! Progress stream emitter.
//!
//! A one-way, append-only channel of discrete JSON events, one per line,
//! handed to the HTTP layer as pre-serialized NDJSON. A closed transport
//! is an expected condition: sends after close are swallowed silently and
//! only flip a flag the controller uses for logging -- the job itself
//! keeps running (disconnect-tolerant completion).

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use airwave_core::types::{Credits, GenerationResult};

/// Events written to the progress stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The job was accepted and submitted. Carries enough information for
    /// the caller to request cancellation.
    Started {
        job_id: Uuid,
        provider_job_id: String,
    },
    /// Terminal outcome.
    Result {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        library_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        credits_remaining: Credits,
        #[serde(skip_serializing_if = "Option::is_none")]
        credits_deducted: Option<Credits>,
    },
}

impl StreamEvent {
    /// Terminal success event for a persisted [`GenerationResult`].
    pub fn success(
        result: &GenerationResult,
        title: impl Into<String>,
        credits_remaining: Credits,
    ) -> Self {
        StreamEvent::Result {
            success: true,
            audio_url: Some(result.artifact_url.clone()),
            title: Some(title.into()),
            library_id: Some(result.library_id.clone()),
            error: None,
            credits_remaining,
            credits_deducted: Some(result.credits_deducted),
        }
    }

    /// Terminal failure event with an already-sanitized message.
    pub fn failure(error: impl Into<String>, credits_remaining: Credits) -> Self {
        StreamEvent::Result {
            success: false,
            audio_url: None,
            title: None,
            library_id: None,
            error: Some(error.into()),
            credits_remaining,
            credits_deducted: None,
        }
    }
}

/// Writer half of the progress stream.
pub struct StreamEmitter {
    tx: mpsc::Sender<String>,
    disconnected: AtomicBool,
}

impl StreamEmitter {
    /// Create an emitter and the receiver the HTTP layer drains.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                tx,
                disconnected: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Serialize and send one event as a single flushed line. Errors from
    /// a closed transport are swallowed.
    pub async fn emit(&self, event: StreamEvent) {
        let mut line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(_) => return,
        };
        line.push('\n');

        if self.tx.send(line).await.is_err() {
            self.disconnected.store(true, Ordering::Relaxed);
        }
    }

    /// Whether the transport has gone away. Observed by the poll loop for
    /// logging only -- never as a cancellation signal.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Relaxed) || self.tx.is_closed()
    }
}
