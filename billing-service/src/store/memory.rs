//! In-memory store.
//!
//! Backs the integration tests and local development. Predicate finders
//! mirror the queries a document store would run for the sweeps; string
//! ordering on invoice numbers matches their lexicographic index ordering.

use super::{AuditStore, InvoiceStore, Page, PlanStore, SubscriptionStore, TenantStore};
use crate::models::{
    AuditLog, AuditQuery, Invoice, InvoiceStatus, Plan, Subscription, SubscriptionStatus, Tenant,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    tenants: RwLock<HashMap<String, Tenant>>,
    plans: RwLock<HashMap<Uuid, Plan>>,
    subscriptions: RwLock<HashMap<Uuid, Subscription>>,
    invoices: RwLock<HashMap<Uuid, Invoice>>,
    audit_logs: RwLock<Vec<AuditLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn get(&self, tenant_id: &str) -> Result<Option<Tenant>, AppError> {
        Ok(self.tenants.read().await.get(tenant_id).cloned())
    }

    async fn create(&self, tenant: Tenant) -> Result<(), AppError> {
        let mut tenants = self.tenants.write().await;
        if tenants.contains_key(&tenant.tenant_id) {
            return Err(AppError::Duplicate(anyhow::anyhow!(
                "Tenant with id '{}' already exists",
                tenant.tenant_id
            )));
        }
        tenants.insert(tenant.tenant_id.clone(), tenant);
        Ok(())
    }

    async fn replace(&self, tenant: Tenant) -> Result<(), AppError> {
        let mut tenants = self.tenants.write().await;
        if !tenants.contains_key(&tenant.tenant_id) {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Tenant '{}' does not exist",
                tenant.tenant_id
            )));
        }
        tenants.insert(tenant.tenant_id.clone(), tenant);
        Ok(())
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.tenants.read().await.len())
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn get(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
        Ok(self.plans.read().await.get(&plan_id).cloned())
    }

    async fn active_plans(&self) -> Result<Vec<Plan>, AppError> {
        let mut plans: Vec<Plan> = self
            .plans
            .read()
            .await
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.price.cmp(&b.price))
        });
        Ok(plans)
    }

    async fn create(&self, plan: Plan) -> Result<(), AppError> {
        self.plans.write().await.insert(plan.plan_id, plan);
        Ok(())
    }

    async fn replace(&self, plan: Plan) -> Result<(), AppError> {
        let mut plans = self.plans.write().await;
        if !plans.contains_key(&plan.plan_id) {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Plan '{}' does not exist",
                plan.plan_id
            )));
        }
        plans.insert(plan.plan_id, plan);
        Ok(())
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.plans.read().await.len())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get(&self, subscription_id: Uuid) -> Result<Option<Subscription>, AppError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .get(&subscription_id)
            .cloned())
    }

    async fn create(&self, subscription: Subscription) -> Result<(), AppError> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.subscription_id, subscription);
        Ok(())
    }

    async fn replace(&self, subscription: Subscription) -> Result<(), AppError> {
        let mut subscriptions = self.subscriptions.write().await;
        if !subscriptions.contains_key(&subscription.subscription_id) {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Subscription '{}' does not exist",
                subscription.subscription_id
            )));
        }
        subscriptions.insert(subscription.subscription_id, subscription);
        Ok(())
    }

    async fn by_tenant(&self, tenant_id: &str) -> Result<Vec<Subscription>, AppError> {
        let mut subs: Vec<Subscription> = self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(subs)
    }

    async fn active_by_tenant(&self, tenant_id: &str) -> Result<Option<Subscription>, AppError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .find(|s| s.tenant_id == tenant_id && s.status == SubscriptionStatus::Active)
            .cloned())
    }

    async fn due_for_billing(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, AppError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.status == SubscriptionStatus::Active && s.next_billing_date <= now)
            .cloned()
            .collect())
    }

    async fn list(&self, page: usize, page_size: usize) -> Result<Page<Subscription>, AppError> {
        let subscriptions = self.subscriptions.read().await;
        let mut all: Vec<Subscription> = subscriptions.values().cloned().collect();
        all.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        let total = all.len();
        let items = all
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok(Page { items, total })
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.subscriptions.read().await.len())
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn get(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.invoices.read().await.get(&invoice_id).cloned())
    }

    async fn by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, AppError> {
        Ok(self
            .invoices
            .read()
            .await
            .values()
            .find(|i| i.invoice_number == invoice_number)
            .cloned())
    }

    async fn create(&self, invoice: Invoice) -> Result<(), AppError> {
        let mut invoices = self.invoices.write().await;
        if invoices
            .values()
            .any(|i| i.invoice_number == invoice.invoice_number)
        {
            return Err(AppError::Duplicate(anyhow::anyhow!(
                "Invoice number '{}' already exists",
                invoice.invoice_number
            )));
        }
        invoices.insert(invoice.invoice_id, invoice);
        Ok(())
    }

    async fn replace(&self, invoice: Invoice) -> Result<(), AppError> {
        let mut invoices = self.invoices.write().await;
        if !invoices.contains_key(&invoice.invoice_id) {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Invoice '{}' does not exist",
                invoice.invoice_id
            )));
        }
        invoices.insert(invoice.invoice_id, invoice);
        Ok(())
    }

    async fn by_tenant(&self, tenant_id: &str) -> Result<Vec<Invoice>, AppError> {
        let mut invoices: Vec<Invoice> = self
            .invoices
            .read()
            .await
            .values()
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(invoices)
    }

    async fn by_subscription(&self, subscription_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let mut invoices: Vec<Invoice> = self
            .invoices
            .read()
            .await
            .values()
            .filter(|i| i.subscription_id == subscription_id)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(invoices)
    }

    async fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<Invoice>, AppError> {
        Ok(self
            .invoices
            .read()
            .await
            .values()
            .filter(|i| {
                matches!(i.status, InvoiceStatus::Pending | InvoiceStatus::Failed)
                    && i.due_date < now
            })
            .cloned()
            .collect())
    }

    async fn due_for_retry(
        &self,
        now: DateTime<Utc>,
        max_retries: i32,
    ) -> Result<Vec<Invoice>, AppError> {
        Ok(self
            .invoices
            .read()
            .await
            .values()
            .filter(|i| {
                i.status == InvoiceStatus::Failed
                    && i.payment_retry_count < max_retries
                    && i.next_retry_date.is_some_and(|d| d <= now)
            })
            .cloned()
            .collect())
    }

    async fn max_number_with_prefix(&self, prefix: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .invoices
            .read()
            .await
            .values()
            .filter(|i| i.invoice_number.starts_with(prefix))
            .map(|i| i.invoice_number.clone())
            .max())
    }

    async fn list(&self, page: usize, page_size: usize) -> Result<Page<Invoice>, AppError> {
        let invoices = self.invoices.read().await;
        let mut all: Vec<Invoice> = invoices.values().cloned().collect();
        all.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        let total = all.len();
        let items = all
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok(Page { items, total })
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.invoices.read().await.len())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: AuditLog) -> Result<(), AppError> {
        self.audit_logs.write().await.push(entry);
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<Page<AuditLog>, AppError> {
        let logs = self.audit_logs.read().await;
        let mut matching: Vec<AuditLog> = logs
            .iter()
            .filter(|l| {
                query
                    .tenant_id
                    .as_ref()
                    .is_none_or(|t| &l.tenant_id == t)
                    && query.action.as_ref().is_none_or(|a| &l.action == a)
                    && query
                        .entity_type
                        .as_ref()
                        .is_none_or(|e| &l.entity_type == e)
                    && query.from.is_none_or(|f| l.timestamp >= f)
                    && query.to.is_none_or(|t| l.timestamp <= t)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let total = matching.len();
        let page_size = if query.page_size == 0 {
            50
        } else {
            query.page_size
        };
        let items = matching
            .into_iter()
            .skip(query.page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok(Page { items, total })
    }

    async fn count_by_tenant(&self, tenant_id: &str) -> Result<usize, AppError> {
        Ok(self
            .audit_logs
            .read()
            .await
            .iter()
            .filter(|l| l.tenant_id == tenant_id)
            .count())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let mut logs = self.audit_logs.write().await;
        let before = logs.len();
        logs.retain(|l| l.timestamp >= cutoff);
        Ok(before - logs.len())
    }
}
