//! Sweep trigger endpoints.
//!
//! The sweeps are also run on a schedule; these endpoints exist for
//! operations tooling and tests. Each is safe to invoke repeatedly: the
//! "due" selections are idempotent.

use crate::services::{BillingSweepOutcome, OverdueSweepOutcome, RetrySweepOutcome};
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;

pub async fn run_billing_sweep(
    State(state): State<AppState>,
) -> Result<Json<BillingSweepOutcome>, AppError> {
    Ok(Json(state.subscriptions.run_billing_sweep().await?))
}

pub async fn run_overdue_sweep(
    State(state): State<AppState>,
) -> Result<Json<OverdueSweepOutcome>, AppError> {
    Ok(Json(state.invoices.run_overdue_sweep().await?))
}

pub async fn run_retry_sweep(
    State(state): State<AppState>,
) -> Result<Json<RetrySweepOutcome>, AppError> {
    Ok(Json(state.invoices.run_retry_sweep().await?))
}
