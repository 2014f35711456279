//! Invoice handlers.

use crate::middleware::TenantContext;
use crate::models::{CreateInvoiceRequest, Invoice, UpdateInvoiceStatusRequest};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

fn guard_tenant(invoice: &Invoice, tenant: &TenantContext) -> Result<(), AppError> {
    if invoice.tenant_id != tenant.tenant_id {
        return Err(AppError::TenantIsolation(anyhow::anyhow!(
            "Invoice belongs to a different tenant"
        )));
    }
    Ok(())
}

pub async fn create_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    payload.validate()?;

    let invoice = state.invoices.create(payload, &tenant.user_id).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state.invoices.get(invoice_id).await?;
    guard_tenant(&invoice, &tenant)?;
    Ok(Json(invoice))
}

pub async fn update_invoice_status(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceStatusRequest>,
) -> Result<Json<Invoice>, AppError> {
    payload.validate()?;

    let existing = state.invoices.get(invoice_id).await?;
    guard_tenant(&existing, &tenant)?;

    let invoice = state
        .invoices
        .update_status(invoice_id, payload, &tenant.user_id)
        .await?;
    Ok(Json(invoice))
}

/// Materialize the next invoice for a subscription.
pub async fn generate_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(subscription_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    let subscription = state.subscriptions.get(subscription_id).await?;
    if subscription.tenant_id != tenant.tenant_id {
        return Err(AppError::TenantIsolation(anyhow::anyhow!(
            "Subscription belongs to a different tenant"
        )));
    }

    let invoice = state
        .invoices
        .generate_for_subscription(subscription_id, &tenant.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_tenant_invoices(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    if tenant_id != tenant.tenant_id {
        return Err(AppError::TenantIsolation(anyhow::anyhow!(
            "Cannot list another tenant's invoices"
        )));
    }
    Ok(Json(state.invoices.by_tenant(&tenant_id).await?))
}

pub async fn list_subscription_invoices(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(subscription_id): Path<Uuid>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let subscription = state.subscriptions.get(subscription_id).await?;
    if subscription.tenant_id != tenant.tenant_id {
        return Err(AppError::TenantIsolation(anyhow::anyhow!(
            "Subscription belongs to a different tenant"
        )));
    }
    Ok(Json(state.invoices.by_subscription(subscription_id).await?))
}
