//! Storage contracts.
//!
//! Persistence is an external collaborator: the engine only ever talks to
//! these traits. Every mutation is a full-document replace; there is no
//! partial-field update primitive, so callers read, modify, and write back
//! whole entities.

mod memory;

pub use memory::MemoryStore;

use crate::models::{
    AuditLog, AuditQuery, Invoice, Plan, Subscription, Tenant,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use uuid::Uuid;

/// One page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get(&self, tenant_id: &str) -> Result<Option<Tenant>, AppError>;
    async fn create(&self, tenant: Tenant) -> Result<(), AppError>;
    async fn replace(&self, tenant: Tenant) -> Result<(), AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn get(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError>;
    /// Active plans ordered by sort key, then price, ascending.
    async fn active_plans(&self) -> Result<Vec<Plan>, AppError>;
    async fn create(&self, plan: Plan) -> Result<(), AppError>;
    async fn replace(&self, plan: Plan) -> Result<(), AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get(&self, subscription_id: Uuid) -> Result<Option<Subscription>, AppError>;
    async fn create(&self, subscription: Subscription) -> Result<(), AppError>;
    async fn replace(&self, subscription: Subscription) -> Result<(), AppError>;
    async fn by_tenant(&self, tenant_id: &str) -> Result<Vec<Subscription>, AppError>;
    /// The tenant's `Active` subscription, if any. At most one exists.
    async fn active_by_tenant(&self, tenant_id: &str) -> Result<Option<Subscription>, AppError>;
    /// Subscriptions with status `Active` and `next_billing_date <= now`.
    async fn due_for_billing(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, AppError>;
    async fn list(&self, page: usize, page_size: usize) -> Result<Page<Subscription>, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn get(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError>;
    async fn by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, AppError>;
    /// Fails with `Duplicate` if the invoice number is already taken.
    async fn create(&self, invoice: Invoice) -> Result<(), AppError>;
    async fn replace(&self, invoice: Invoice) -> Result<(), AppError>;
    async fn by_tenant(&self, tenant_id: &str) -> Result<Vec<Invoice>, AppError>;
    async fn by_subscription(&self, subscription_id: Uuid) -> Result<Vec<Invoice>, AppError>;
    /// Invoices with status `Pending` or `Failed` and `due_date < now`.
    async fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<Invoice>, AppError>;
    /// `Failed` invoices with `next_retry_date <= now` and fewer than
    /// `max_retries` attempts.
    async fn due_for_retry(
        &self,
        now: DateTime<Utc>,
        max_retries: i32,
    ) -> Result<Vec<Invoice>, AppError>;
    /// Highest existing invoice number starting with `prefix`, by string
    /// ordering. Seeds the per-month sequence.
    async fn max_number_with_prefix(&self, prefix: &str) -> Result<Option<String>, AppError>;
    async fn list(&self, page: usize, page_size: usize) -> Result<Page<Invoice>, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: AuditLog) -> Result<(), AppError>;
    async fn query(&self, query: &AuditQuery) -> Result<Page<AuditLog>, AppError>;
    async fn count_by_tenant(&self, tenant_id: &str) -> Result<usize, AppError>;
    /// Deletes records older than the cutoff, returning how many went away.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError>;
}
