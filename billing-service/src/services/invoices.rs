//! Invoice lifecycle engine.

use crate::models::{
    AuditEntry, AuditSeverity, CreateInvoiceRequest, Invoice, InvoiceLineItem, InvoiceStatus,
    UpdateInvoiceStatusRequest,
};
use crate::services::audit::AuditTrail;
use crate::services::metrics::{DUNNING_SWEEP_ITEMS_TOTAL, INVOICES_ISSUED_TOTAL};
use crate::services::numbering::InvoiceSequencer;
use crate::services::tax::TaxStrategy;
use crate::store::{InvoiceStore, PlanStore, SubscriptionStore};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Automatic retries stop once the count reaches this value; the counter
/// itself keeps incrementing on further failure reports.
pub const MAX_PAYMENT_RETRIES: i32 = 3;

/// Advance retry bookkeeping after a failed collection: bump the count and
/// either schedule the next attempt with exponential backoff (2^count days)
/// or, once the count reaches the retry ceiling, clear the schedule so the
/// invoice waits for manual or webhook intervention.
pub(crate) fn schedule_payment_retry(invoice: &mut Invoice, now: DateTime<Utc>) {
    invoice.payment_retry_count += 1;
    if invoice.payment_retry_count >= MAX_PAYMENT_RETRIES {
        invoice.next_retry_date = None;
    } else {
        invoice.next_retry_date =
            Some(now + Duration::days(1i64 << invoice.payment_retry_count));
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct OverdueSweepOutcome {
    pub marked_overdue: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct RetrySweepOutcome {
    pub scheduled: usize,
    pub exhausted: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct InvoiceEngine {
    invoices: Arc<dyn InvoiceStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    plans: Arc<dyn PlanStore>,
    sequencer: Arc<InvoiceSequencer>,
    tax: Arc<dyn TaxStrategy>,
    audit: AuditTrail,
}

impl InvoiceEngine {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        plans: Arc<dyn PlanStore>,
        tax: Arc<dyn TaxStrategy>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            invoices,
            subscriptions,
            plans,
            sequencer: Arc::new(InvoiceSequencer::new()),
            tax,
            audit,
        }
    }

    /// Create an invoice from caller-supplied amounts and line items.
    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id))]
    pub async fn create(
        &self,
        request: CreateInvoiceRequest,
        created_by: &str,
    ) -> Result<Invoice, AppError> {
        let invoice_number = self.sequencer.allocate(self.invoices.as_ref()).await?;
        let now = Utc::now();

        let line_items = request
            .line_items
            .into_iter()
            .map(|item| InvoiceLineItem {
                description: item.description,
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: Decimal::from(item.quantity) * item.unit_price,
                period_start: item.period_start,
                period_end: item.period_end,
            })
            .collect();

        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number,
            tenant_id: request.tenant_id,
            subscription_id: request.subscription_id,
            status: InvoiceStatus::Pending,
            amount: request.amount,
            tax_amount: request.tax_amount,
            total_amount: request.amount + request.tax_amount,
            currency: request.currency,
            issue_date: now,
            due_date: request.due_date,
            paid_date: None,
            line_items,
            payment_method: None,
            payment_transaction_id: None,
            notes: request.notes,
            payment_retry_count: 0,
            next_retry_date: None,
            created_utc: now,
            updated_utc: now,
            created_by: Some(created_by.to_string()),
            updated_by: Some(created_by.to_string()),
        };

        self.invoices.create(invoice.clone()).await?;

        if let Some(counter) = INVOICES_ISSUED_TOTAL.get() {
            counter
                .with_label_values(&[invoice.tenant_id.as_str(), "manual"])
                .inc();
        }

        tracing::info!(
            invoice_number = %invoice.invoice_number,
            tenant_id = %invoice.tenant_id,
            "Invoice created"
        );

        Ok(invoice)
    }

    /// Materialize the next invoice for a subscription: plan price snapshot
    /// as the amount, tax from the configured strategy, and one line item
    /// covering the billing period. Subscriptions still in trial cannot be
    /// billed.
    #[instrument(skip(self))]
    pub async fn generate_for_subscription(
        &self,
        subscription_id: Uuid,
        created_by: &str,
    ) -> Result<Invoice, AppError> {
        let subscription = self
            .subscriptions
            .get(subscription_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Subscription '{}' was not found",
                    subscription_id
                ))
            })?;

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
        if subscription.is_trial_active
            && subscription.trial_end_date.is_some_and(|end| end > now)
        {
            return Err(AppError::Business(anyhow::anyhow!(
                "Cannot generate invoice during trial period"
            )));
        }

        let invoice_number = self.sequencer.allocate(self.invoices.as_ref()).await?;
        let amount = subscription.current_price;
        let tax_amount = self.tax.compute_tax(amount, &subscription.tenant_id);
        let period_start = subscription.last_billed_date.unwrap_or(subscription.start_date);
        let period_end = subscription.next_billing_date;

        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number,
            tenant_id: subscription.tenant_id.clone(),
            subscription_id,
            status: InvoiceStatus::Pending,
            amount,
            tax_amount,
            total_amount: amount + tax_amount,
            currency: "USD".to_string(),
            issue_date: now,
            due_date: now + Duration::days(30),
            paid_date: None,
            line_items: vec![InvoiceLineItem {
                description: format!(
                    "{} - {} subscription",
                    plan.name,
                    plan.billing_cycle.as_str()
                ),
                quantity: 1,
                unit_price: amount,
                total_price: amount,
                period_start: Some(period_start),
                period_end: Some(period_end),
            }],
            payment_method: None,
            payment_transaction_id: None,
            notes: None,
            payment_retry_count: 0,
            next_retry_date: None,
            created_utc: now,
            updated_utc: now,
            created_by: Some(created_by.to_string()),
            updated_by: Some(created_by.to_string()),
        };

        self.invoices.create(invoice.clone()).await?;

        if let Some(counter) = INVOICES_ISSUED_TOTAL.get() {
            counter
                .with_label_values(&[invoice.tenant_id.as_str(), "subscription"])
                .inc();
        }

        self.audit
            .record(AuditEntry {
                tenant_id: subscription.tenant_id.clone(),
                user_id: created_by.to_string(),
                action: "GENERATE_INVOICE".to_string(),
                entity_type: "Invoice".to_string(),
                entity_id: Some(invoice.invoice_id.to_string()),
                description: Some(format!(
                    "Generated invoice {} for subscription {}",
                    invoice.invoice_number, subscription_id
                )),
                ..Default::default()
            })
            .await;

        Ok(invoice)
    }

    /// Assign a new status. Entering `Paid` stamps `paid_date` only when it
    /// was previously unset.
    #[instrument(skip(self, request))]
    pub async fn update_status(
        &self,
        invoice_id: Uuid,
        request: UpdateInvoiceStatusRequest,
        updated_by: &str,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.get(invoice_id).await?;
        let now = Utc::now();

        invoice.status = request.status;
        invoice.payment_method = request.payment_method;
        invoice.payment_transaction_id = request.payment_transaction_id;
        invoice.notes = request.notes;
        invoice.updated_by = Some(updated_by.to_string());
        invoice.updated_utc = now;

        if request.status == InvoiceStatus::Paid && invoice.paid_date.is_none() {
            invoice.paid_date = Some(now);
        }

        self.invoices.replace(invoice.clone()).await?;

        Ok(invoice)
    }

    pub async fn get(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        self.invoices.get(invoice_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Invoice '{}' was not found", invoice_id))
        })
    }

    pub async fn by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, AppError> {
        self.invoices.by_number(invoice_number).await
    }

    pub async fn by_tenant(&self, tenant_id: &str) -> Result<Vec<Invoice>, AppError> {
        self.invoices.by_tenant(tenant_id).await
    }

    pub async fn by_subscription(&self, subscription_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        self.invoices.by_subscription(subscription_id).await
    }

    /// Move `Pending`/`Failed` invoices past their due date to `Overdue`.
    /// Already-overdue invoices are not selected again, so repeat runs with
    /// no time change are no-ops.
    #[instrument(skip(self))]
    pub async fn run_overdue_sweep(&self) -> Result<OverdueSweepOutcome, AppError> {
        let now = Utc::now();
        let overdue = self.invoices.overdue(now).await?;
        let mut outcome = OverdueSweepOutcome::default();

        tracing::info!(due = overdue.len(), "Overdue sweep started");

        for invoice in overdue {
            match self.mark_overdue(&invoice, now).await {
                Ok(()) => {
                    outcome.marked_overdue += 1;
                    if let Some(counter) = DUNNING_SWEEP_ITEMS_TOTAL.get() {
                        counter.with_label_values(&["overdue", "ok"]).inc();
                    }
                }
                Err(e) => {
                    outcome.failed += 1;
                    if let Some(counter) = DUNNING_SWEEP_ITEMS_TOTAL.get() {
                        counter.with_label_values(&["overdue", "error"]).inc();
                    }
                    tracing::warn!(
                        invoice_id = %invoice.invoice_id,
                        error = %e,
                        "Failed to mark invoice overdue"
                    );
                    self.audit
                        .record(AuditEntry {
                            tenant_id: invoice.tenant_id.clone(),
                            user_id: "system".to_string(),
                            action: "OVERDUE_ERROR".to_string(),
                            entity_type: "Invoice".to_string(),
                            entity_id: Some(invoice.invoice_id.to_string()),
                            description: Some(format!("Failed to mark invoice as overdue: {}", e)),
                            severity: Some(AuditSeverity::Error),
                            ..Default::default()
                        })
                        .await;
                }
            }
        }

        Ok(outcome)
    }

    async fn mark_overdue(&self, invoice: &Invoice, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut updated = invoice.clone();
        updated.status = InvoiceStatus::Overdue;
        updated.updated_utc = now;
        self.invoices.replace(updated).await?;

        self.audit
            .record(AuditEntry {
                tenant_id: invoice.tenant_id.clone(),
                user_id: "system".to_string(),
                action: "MARK_OVERDUE".to_string(),
                entity_type: "Invoice".to_string(),
                entity_id: Some(invoice.invoice_id.to_string()),
                description: Some(format!(
                    "Marked invoice {} as overdue",
                    invoice.invoice_number
                )),
                severity: Some(AuditSeverity::Warning),
                ..Default::default()
            })
            .await;

        Ok(())
    }

    /// Advance retry bookkeeping for `Failed` invoices whose retry date has
    /// arrived. Collection itself happens out of band; the outcome comes
    /// back through the webhook reconciler.
    #[instrument(skip(self))]
    pub async fn run_retry_sweep(&self) -> Result<RetrySweepOutcome, AppError> {
        let now = Utc::now();
        let due = self.invoices.due_for_retry(now, MAX_PAYMENT_RETRIES).await?;
        let mut outcome = RetrySweepOutcome::default();

        tracing::info!(due = due.len(), "Payment retry sweep started");

        for invoice in due {
            match self.advance_retry(&invoice, now).await {
                Ok(exhausted) => {
                    if exhausted {
                        outcome.exhausted += 1;
                    } else {
                        outcome.scheduled += 1;
                    }
                    if let Some(counter) = DUNNING_SWEEP_ITEMS_TOTAL.get() {
                        counter.with_label_values(&["retry", "ok"]).inc();
                    }
                }
                Err(e) => {
                    outcome.failed += 1;
                    if let Some(counter) = DUNNING_SWEEP_ITEMS_TOTAL.get() {
                        counter.with_label_values(&["retry", "error"]).inc();
                    }
                    tracing::warn!(
                        invoice_id = %invoice.invoice_id,
                        error = %e,
                        "Failed to process payment retry"
                    );
                    self.audit
                        .record(AuditEntry {
                            tenant_id: invoice.tenant_id.clone(),
                            user_id: "system".to_string(),
                            action: "RETRY_ERROR".to_string(),
                            entity_type: "Invoice".to_string(),
                            entity_id: Some(invoice.invoice_id.to_string()),
                            description: Some(format!("Failed to process payment retry: {}", e)),
                            severity: Some(AuditSeverity::Error),
                            ..Default::default()
                        })
                        .await;
                }
            }
        }

        Ok(outcome)
    }

    async fn advance_retry(
        &self,
        invoice: &Invoice,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut updated = invoice.clone();
        schedule_payment_retry(&mut updated, now);
        updated.updated_utc = now;
        let exhausted = updated.next_retry_date.is_none();
        self.invoices.replace(updated.clone()).await?;

        self.audit
            .record(AuditEntry {
                tenant_id: invoice.tenant_id.clone(),
                user_id: "system".to_string(),
                action: "PAYMENT_RETRY".to_string(),
                entity_type: "Invoice".to_string(),
                entity_id: Some(invoice.invoice_id.to_string()),
                description: Some(format!(
                    "Payment retry attempt {} for invoice {}",
                    updated.payment_retry_count, invoice.invoice_number
                )),
                ..Default::default()
            })
            .await;

        Ok(exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_with_retries(count: i32) -> Invoice {
        let now = Utc::now();
        Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number: "INV-202401-0001".to_string(),
            tenant_id: "tenant-1".to_string(),
            subscription_id: Uuid::new_v4(),
            status: InvoiceStatus::Failed,
            amount: Decimal::new(1000, 2),
            tax_amount: Decimal::new(100, 2),
            total_amount: Decimal::new(1100, 2),
            currency: "USD".to_string(),
            issue_date: now,
            due_date: now,
            paid_date: None,
            line_items: vec![],
            payment_method: None,
            payment_transaction_id: None,
            notes: None,
            payment_retry_count: count,
            next_retry_date: Some(now),
            created_utc: now,
            updated_utc: now,
            created_by: None,
            updated_by: None,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let now = Utc::now();

        let mut invoice = invoice_with_retries(0);
        schedule_payment_retry(&mut invoice, now);
        assert_eq!(invoice.payment_retry_count, 1);
        assert_eq!(invoice.next_retry_date, Some(now + Duration::days(2)));

        schedule_payment_retry(&mut invoice, now);
        assert_eq!(invoice.payment_retry_count, 2);
        assert_eq!(invoice.next_retry_date, Some(now + Duration::days(4)));
    }

    #[test]
    fn third_attempt_clears_schedule() {
        let now = Utc::now();
        let mut invoice = invoice_with_retries(2);

        schedule_payment_retry(&mut invoice, now);
        assert_eq!(invoice.payment_retry_count, 3);
        assert_eq!(invoice.next_retry_date, None);
    }

    #[test]
    fn counter_keeps_incrementing_past_the_ceiling() {
        let now = Utc::now();
        let mut invoice = invoice_with_retries(3);

        schedule_payment_retry(&mut invoice, now);
        assert_eq!(invoice.payment_retry_count, 4);
        assert_eq!(invoice.next_retry_date, None);
    }
}
