//! Tenant context extraction.
//!
//! Tenant attribution arrives in headers set by the authenticating edge
//! (gateway/BFF) after it has validated the caller's membership; the engine
//! trusts them as-is.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

/// Tenant context for a request.
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Business identifier of the tenant making the request.
    pub tenant_id: String,
    /// Acting user, for audit attribution. Defaults to "system" when the
    /// edge did not forward one.
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = parts
            .headers
            .get("X-Tenant-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing X-Tenant-ID header"))
            })?
            .to_string();

        let user_id = parts
            .headers
            .get("X-User-ID")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("system")
            .to_string();

        let span = tracing::Span::current();
        span.record("tenant_id", tenant_id.as_str());

        Ok(TenantContext { tenant_id, user_id })
    }
}
