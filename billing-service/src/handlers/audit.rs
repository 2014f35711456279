//! Audit log read handlers.

use crate::middleware::TenantContext;
use crate::models::AuditQuery;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AuditListParams {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    50
}

pub async fn list_tenant_audit_logs(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(tenant_id): Path<String>,
    Query(params): Query<AuditListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    if tenant_id != tenant.tenant_id {
        return Err(AppError::TenantIsolation(anyhow::anyhow!(
            "Cannot read another tenant's audit trail"
        )));
    }

    let page = state
        .audit
        .query(&AuditQuery {
            tenant_id: Some(tenant_id),
            action: params.action,
            entity_type: params.entity_type,
            from: None,
            to: None,
            page: params.page,
            page_size: params.page_size,
        })
        .await?;

    Ok(Json(serde_json::json!({
        "items": page.items,
        "total": page.total,
    })))
}
