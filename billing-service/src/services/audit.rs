//! Audit trail.
//!
//! Append is fire-and-forget from the caller's perspective: a failed write
//! is logged and swallowed so the primary operation never fails on auditing.

use crate::models::{AuditEntry, AuditLog, AuditQuery, AuditSeverity};
use crate::store::{AuditStore, Page};
use chrono::{Duration, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append an audit record. Never fails the caller.
    pub async fn record(&self, entry: AuditEntry) {
        let log = AuditLog {
            audit_id: Uuid::new_v4(),
            tenant_id: entry.tenant_id,
            user_id: entry.user_id,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            timestamp: Utc::now(),
            description: entry.description,
            severity: entry.severity.unwrap_or(AuditSeverity::Info),
            correlation_id: entry.correlation_id,
            old_values: entry.old_values,
            new_values: entry.new_values,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
        };

        if let Err(e) = self.store.append(log).await {
            tracing::warn!(error = %e, "Failed to append audit record");
        }
    }

    pub async fn query(&self, query: &AuditQuery) -> Result<Page<AuditLog>, AppError> {
        self.store.query(query).await
    }

    /// Drop records older than the retention window.
    pub async fn purge(&self, retention_days: i64) -> Result<usize, AppError> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        self.store.purge_older_than(cutoff).await
    }
}
