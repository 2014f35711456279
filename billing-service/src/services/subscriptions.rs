//! Subscription lifecycle engine.

use crate::models::{
    AuditEntry, AuditSeverity, BillingCycle, CreateSubscriptionRequest, Subscription,
    SubscriptionStatus, UpdateSubscriptionRequest,
};
use crate::services::audit::AuditTrail;
use crate::services::invoices::InvoiceEngine;
use crate::services::metrics::{BILLING_SWEEP_ITEMS_TOTAL, SUBSCRIPTION_OPERATIONS_TOTAL};
use crate::store::{PlanStore, SubscriptionStore, TenantStore};
use chrono::{DateTime, Duration, Months, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Next billing date after `current` for the given cycle.
///
/// Calendar month addition with end-of-month clamping: adding one month to
/// 2024-01-31 lands on 2024-02-29. `Annually` is twelve months, so a Feb 29
/// anchor clamps to Feb 28 in non-leap years.
pub fn next_billing_date(current: DateTime<Utc>, cycle: BillingCycle) -> DateTime<Utc> {
    current
        .checked_add_months(Months::new(cycle.months()))
        .unwrap_or(current)
}

/// Outcome of one billing sweep pass.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct BillingSweepOutcome {
    pub billed: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct SubscriptionEngine {
    subscriptions: Arc<dyn SubscriptionStore>,
    plans: Arc<dyn PlanStore>,
    tenants: Arc<dyn TenantStore>,
    invoices: InvoiceEngine,
    audit: AuditTrail,
}

impl SubscriptionEngine {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        plans: Arc<dyn PlanStore>,
        tenants: Arc<dyn TenantStore>,
        invoices: InvoiceEngine,
        audit: AuditTrail,
    ) -> Self {
        Self {
            subscriptions,
            plans,
            tenants,
            invoices,
            audit,
        }
    }

    /// Create a subscription for a tenant on a plan.
    ///
    /// The tenant may hold at most one `Active` subscription. When a trial
    /// is requested and the plan defines trial days, billing is deferred to
    /// trial exit.
    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id))]
    pub async fn create(
        &self,
        request: CreateSubscriptionRequest,
        created_by: &str,
    ) -> Result<Subscription, AppError> {
        let tenant = self
            .tenants
            .get(&request.tenant_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Tenant '{}' was not found",
                    request.tenant_id
                ))
            })?;

        let plan = self.plans.get(request.plan_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Plan '{}' was not found", request.plan_id))
        })?;

        if self
            .subscriptions
            .active_by_tenant(&tenant.tenant_id)
            .await?
            .is_some()
        {
            return Err(AppError::Business(anyhow::anyhow!(
                "Tenant already has an active subscription"
            )));
        }

        let now = Utc::now();
        let mut subscription = Subscription {
            subscription_id: Uuid::new_v4(),
            tenant_id: request.tenant_id.clone(),
            plan_id: plan.plan_id,
            status: SubscriptionStatus::Active,
            start_date: request.start_date,
            end_date: request.end_date,
            next_billing_date: next_billing_date(request.start_date, plan.billing_cycle),
            current_price: plan.price,
            is_trial_active: false,
            trial_end_date: None,
            last_billed_date: None,
            billing_cycle_count: 0,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            metadata: request.metadata,
            created_utc: now,
            updated_utc: now,
            created_by: Some(created_by.to_string()),
            updated_by: Some(created_by.to_string()),
        };

        if request.start_trial {
            if let Some(trial_days) = plan.trial_days {
                let trial_end = now + Duration::days(trial_days);
                subscription.is_trial_active = true;
                subscription.trial_end_date = Some(trial_end);
                subscription.next_billing_date = trial_end;
            }
        }

        self.subscriptions.create(subscription.clone()).await?;

        if let Some(counter) = SUBSCRIPTION_OPERATIONS_TOTAL.get() {
            counter
                .with_label_values(&[subscription.tenant_id.as_str(), "create"])
                .inc();
        }

        self.audit
            .record(AuditEntry {
                tenant_id: subscription.tenant_id.clone(),
                user_id: created_by.to_string(),
                action: "CREATE_SUBSCRIPTION".to_string(),
                entity_type: "Subscription".to_string(),
                entity_id: Some(subscription.subscription_id.to_string()),
                description: Some(format!("Subscribed to plan '{}'", plan.name)),
                ..Default::default()
            })
            .await;

        tracing::info!(
            subscription_id = %subscription.subscription_id,
            plan_id = %plan.plan_id,
            trial = subscription.is_trial_active,
            "Subscription created"
        );

        Ok(subscription)
    }

    /// Update a subscription's status and end date.
    ///
    /// Any target status is accepted; moving into `Cancelled` stamps the
    /// cancellation fields.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        subscription_id: Uuid,
        request: UpdateSubscriptionRequest,
        updated_by: &str,
    ) -> Result<Subscription, AppError> {
        let mut subscription = self.get(subscription_id).await?;
        let now = Utc::now();

        subscription.status = request.status;
        subscription.end_date = request.end_date;
        subscription.metadata = request.metadata;
        subscription.updated_by = Some(updated_by.to_string());
        subscription.updated_utc = now;

        if request.status == SubscriptionStatus::Cancelled {
            subscription.cancelled_at = Some(now);
            subscription.cancelled_by = Some(updated_by.to_string());
            subscription.cancellation_reason = request.cancellation_reason;
        }

        self.subscriptions.replace(subscription.clone()).await?;

        if let Some(counter) = SUBSCRIPTION_OPERATIONS_TOTAL.get() {
            counter
                .with_label_values(&[subscription.tenant_id.as_str(), "update"])
                .inc();
        }

        Ok(subscription)
    }

    /// Cancel a subscription. Returns `false` when it does not exist; the
    /// transition itself is unconditional, including for subscriptions that
    /// are already cancelled.
    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        subscription_id: Uuid,
        reason: &str,
        cancelled_by: &str,
    ) -> Result<bool, AppError> {
        let Some(mut subscription) = self.subscriptions.get(subscription_id).await? else {
            return Ok(false);
        };

        let now = Utc::now();
        subscription.status = SubscriptionStatus::Cancelled;
        subscription.cancelled_at = Some(now);
        subscription.cancelled_by = Some(cancelled_by.to_string());
        subscription.cancellation_reason = Some(reason.to_string());
        subscription.updated_utc = now;

        self.subscriptions.replace(subscription.clone()).await?;

        self.audit
            .record(AuditEntry {
                tenant_id: subscription.tenant_id.clone(),
                user_id: cancelled_by.to_string(),
                action: "CANCEL_SUBSCRIPTION".to_string(),
                entity_type: "Subscription".to_string(),
                entity_id: Some(subscription_id.to_string()),
                description: Some(format!("Cancelled: {}", reason)),
                ..Default::default()
            })
            .await;

        Ok(true)
    }

    pub async fn get(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        self.subscriptions
            .get(subscription_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Subscription '{}' was not found",
                    subscription_id
                ))
            })
    }

    pub async fn by_tenant(&self, tenant_id: &str) -> Result<Vec<Subscription>, AppError> {
        self.subscriptions.by_tenant(tenant_id).await
    }

    pub async fn active_for_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        self.subscriptions.active_by_tenant(tenant_id).await
    }

    /// Bill every `Active` subscription whose `next_billing_date` has
    /// arrived: generate the invoice, advance the billing date by one cycle,
    /// and bump the cycle count. Failures are isolated per subscription; the
    /// sweep always runs to completion and reports through the audit trail.
    #[instrument(skip(self))]
    pub async fn run_billing_sweep(&self) -> Result<BillingSweepOutcome, AppError> {
        let now = Utc::now();
        let due = self.subscriptions.due_for_billing(now).await?;
        let mut outcome = BillingSweepOutcome::default();

        tracing::info!(due = due.len(), "Billing sweep started");

        for subscription in due {
            match self.bill_one(&subscription).await {
                Ok(()) => {
                    outcome.billed += 1;
                    if let Some(counter) = BILLING_SWEEP_ITEMS_TOTAL.get() {
                        counter.with_label_values(&["billed"]).inc();
                    }
                }
                Err(e) => {
                    outcome.failed += 1;
                    if let Some(counter) = BILLING_SWEEP_ITEMS_TOTAL.get() {
                        counter.with_label_values(&["failed"]).inc();
                    }
                    tracing::warn!(
                        subscription_id = %subscription.subscription_id,
                        error = %e,
                        "Billing failed for subscription"
                    );
                    self.audit
                        .record(AuditEntry {
                            tenant_id: subscription.tenant_id.clone(),
                            user_id: "system".to_string(),
                            action: "BILLING_ERROR".to_string(),
                            entity_type: "Subscription".to_string(),
                            entity_id: Some(subscription.subscription_id.to_string()),
                            description: Some(format!("Failed to process billing: {}", e)),
                            severity: Some(AuditSeverity::Error),
                            ..Default::default()
                        })
                        .await;
                }
            }
        }

        tracing::info!(
            billed = outcome.billed,
            failed = outcome.failed,
            "Billing sweep finished"
        );

        Ok(outcome)
    }

    async fn bill_one(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.invoices
            .generate_for_subscription(subscription.subscription_id, "system")
            .await?;

        let plan = self
            .plans
            .get(subscription.plan_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Plan '{}' was not found",
                    subscription.plan_id
                ))
            })?;

        let now = Utc::now();
        let mut updated = subscription.clone();
        updated.next_billing_date = next_billing_date(subscription.next_billing_date, plan.billing_cycle);
        updated.last_billed_date = Some(now);
        updated.billing_cycle_count += 1;
        updated.updated_utc = now;
        self.subscriptions.replace(updated).await?;

        self.audit
            .record(AuditEntry {
                tenant_id: subscription.tenant_id.clone(),
                user_id: "system".to_string(),
                action: "PROCESS_BILLING".to_string(),
                entity_type: "Subscription".to_string(),
                entity_id: Some(subscription.subscription_id.to_string()),
                description: Some("Processed subscription billing".to_string()),
                ..Default::default()
            })
            .await;

        Ok(())
    }
}
