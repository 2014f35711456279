//! Subscription handlers.

use crate::middleware::TenantContext;
use crate::models::{
    CancelSubscriptionRequest, CreateSubscriptionRequest, Subscription, UpdateSubscriptionRequest,
};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

/// Reject cross-tenant access to another tenant's subscription.
fn guard_tenant(subscription: &Subscription, tenant: &TenantContext) -> Result<(), AppError> {
    if subscription.tenant_id != tenant.tenant_id {
        return Err(AppError::TenantIsolation(anyhow::anyhow!(
            "Subscription belongs to a different tenant"
        )));
    }
    Ok(())
}

pub async fn create_subscription(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    payload.validate()?;

    tracing::info!(
        tenant_id = %payload.tenant_id,
        plan_id = %payload.plan_id,
        "Creating subscription"
    );

    let subscription = state.subscriptions.create(payload, &tenant.user_id).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(subscription_id): Path<Uuid>,
) -> Result<Json<Subscription>, AppError> {
    let subscription = state.subscriptions.get(subscription_id).await?;
    guard_tenant(&subscription, &tenant)?;
    Ok(Json(subscription))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> Result<Json<Subscription>, AppError> {
    payload.validate()?;

    let existing = state.subscriptions.get(subscription_id).await?;
    guard_tenant(&existing, &tenant)?;

    let subscription = state
        .subscriptions
        .update(subscription_id, payload, &tenant.user_id)
        .await?;
    Ok(Json(subscription))
}

pub async fn cancel_subscription(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<CancelSubscriptionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload.validate()?;

    let existing = state.subscriptions.get(subscription_id).await?;
    guard_tenant(&existing, &tenant)?;

    let cancelled = state
        .subscriptions
        .cancel(subscription_id, &payload.reason, &tenant.user_id)
        .await?;
    if !cancelled {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Subscription '{}' was not found",
            subscription_id
        )));
    }

    Ok(Json(serde_json::json!({ "cancelled": true })))
}

pub async fn list_tenant_subscriptions(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    if tenant_id != tenant.tenant_id {
        return Err(AppError::TenantIsolation(anyhow::anyhow!(
            "Cannot list another tenant's subscriptions"
        )));
    }
    Ok(Json(state.subscriptions.by_tenant(&tenant_id).await?))
}

pub async fn get_active_subscription(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(tenant_id): Path<String>,
) -> Result<Json<Subscription>, AppError> {
    if tenant_id != tenant.tenant_id {
        return Err(AppError::TenantIsolation(anyhow::anyhow!(
            "Cannot read another tenant's subscription"
        )));
    }
    let subscription = state
        .subscriptions
        .active_for_tenant(&tenant_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "Tenant '{}' has no active subscription",
                tenant_id
            ))
        })?;
    Ok(Json(subscription))
}
