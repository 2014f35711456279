//! Payment gateway webhook intake.

use crate::models::{PaymentEvent, WebhookOutcome};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use service_core::error::AppError;

/// Receive a payment event.
///
/// The signature covers the raw body, so the body is verified exactly as it
/// arrived before it is parsed. The outcome is always 200: the gateway reads
/// the success flag and correlation id from the response.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookOutcome>, AppError> {
    let signature = headers
        .get("X-Webhook-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Malformed webhook payload: {}", e)))?;

    let outcome = state.webhooks.process(&event, &body, signature).await;
    Ok(Json(outcome))
}
