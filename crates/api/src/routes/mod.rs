pub mod generate;
pub mod health;

use axum::routing::post;
use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /generate                      POST   open a generation stream
/// /generate/{job_id}/cancel      POST   explicit cancellation
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate::generate))
        .route("/generate/{job_id}/cancel", post(generate::cancel))
}
