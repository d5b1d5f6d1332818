//! Caller identity extractor.
//!
//! Identity resolution is an upstream collaborator: the gateway
//! authenticates the caller and injects the resolved id as the
//! `x-user-id` header before the request reaches this service. Handlers
//! take an [`AuthUser`] parameter to require it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use airwave_core::error::CoreError;

use crate::error::AppError;

/// Identified caller, extracted from the gateway-injected `x-user-id`
/// header.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing x-user-id header".to_string(),
                ))
            })?;

        Ok(AuthUser {
            user_id: user_id.to_string(),
        })
    }
}
