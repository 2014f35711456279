//! Admission middleware.
//!
//! Resolves the rate-limit key for a request and asks the
//! `AdmissionController` whether it may proceed. Authenticated traffic is
//! keyed by tenant id; everything else falls back to the forwarded client
//! address chain, then the transport peer.

use crate::startup::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use std::net::SocketAddr;

pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = admission_key(&request);

    let decision = state.admission.check(&key).await;
    if !decision.admitted {
        return Err(AppError::RateLimitExceeded {
            retry_after_seconds: decision.retry_after_seconds,
        });
    }

    Ok(next.run(request).await)
}

fn admission_key(request: &Request) -> String {
    if let Some(tenant) = request
        .headers()
        .get("X-Tenant-ID")
        .and_then(|v| v.to_str().ok())
    {
        return tenant.to_string();
    }

    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return forwarded.to_string();
    }

    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
    {
        return real_ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
