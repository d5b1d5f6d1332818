//! Generation endpoints.
//!
//! `POST /generate` validates, resolves content, enforces the bonus quota
//! and deducts credits synchronously -- any of those failing produces a
//! plain JSON error before a stream ever opens. On success the controller
//! detaches onto its own task and the response body becomes the NDJSON
//! progress stream. Closing the connection does NOT cancel the job; only
//! `POST /generate/{job_id}/cancel` does.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use airwave_core::request::{normalize, RawGenerationRequest};
use airwave_engine::StreamEmitter;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/generate
///
/// Body: [`RawGenerationRequest`]. Response: chunked
/// `application/x-ndjson`, one JSON event per line (`started`, then a
/// terminal `result`), closed when the job reaches a terminal state.
pub async fn generate(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(raw): Json<RawGenerationRequest>,
) -> AppResult<Response> {
    let request = normalize(auth.user_id, raw)?;
    let prepared = state.engine.prepare(request).await?;

    let (emitter, rx) = StreamEmitter::channel(state.engine.config().stream_buffer);
    let job_id = Arc::clone(&state.engine).spawn(prepared, emitter);
    tracing::info!(job_id = %job_id, "Generation stream opened");

    let stream = ReceiverStream::new(rx).map(|line| Ok::<_, Infallible>(Bytes::from(line)));

    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

/// POST /api/v1/generate/{job_id}/cancel
///
/// Explicit, affirmative cancellation of an in-flight job owned by the
/// caller. Returns 404 once the job has finished (its refund or artifact
/// already settled the outcome).
pub async fn cancel(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.engine.cancel(&auth.user_id, job_id)?;

    tracing::info!(job_id = %job_id, user_id = %auth.user_id, "Cancellation requested");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "canceled": true }),
    }))
}
