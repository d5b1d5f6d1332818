//! Domain error taxonomy.
//!
//! Every error that can terminate a request *before* the progress stream
//! opens is a [`CoreError`] variant; the API layer maps them onto HTTP
//! statuses. Failures after job submission are never surfaced as errors --
//! they are reported through the stream's terminal event (sanitized) and
//! discharged via the refund path.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A request field violated a structural constraint. Rejected before
    /// any side effect; names the offending field.
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    /// A per-user daily quota was exhausted. Rejected before any credit
    /// deduction.
    #[error("Quota exceeded: {0}")]
    Quota(String),

    /// The ledger refused the deduction (insufficient balance or rejection).
    /// Nothing was deducted, so no refund is owed.
    #[error("Insufficient credits: {0}")]
    InsufficientCredits(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a field-level validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
