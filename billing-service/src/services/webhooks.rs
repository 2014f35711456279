//! Webhook reconciliation.
//!
//! Applies externally reported payment outcomes to invoices. Every branch,
//! including rejections, emits an audit record tagged with a correlation id
//! generated once per delivery; the gateway gets the id back so retried
//! deliveries can be tied together.

use crate::models::{AuditEntry, AuditSeverity, Invoice, InvoiceStatus, PaymentEvent, WebhookOutcome};
use crate::services::audit::AuditTrail;
use crate::services::invoices::schedule_payment_retry;
use crate::services::metrics::WEBHOOK_EVENTS_TOTAL;
use crate::store::InvoiceStore;
use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct WebhookReconciler {
    invoices: Arc<dyn InvoiceStore>,
    audit: AuditTrail,
    secret: Secret<String>,
}

impl WebhookReconciler {
    pub fn new(invoices: Arc<dyn InvoiceStore>, audit: AuditTrail, secret: Secret<String>) -> Self {
        Self {
            invoices,
            audit,
            secret,
        }
    }

    /// Reconcile one delivery. Never fails outward: rejections and internal
    /// errors both come back as an unsuccessful outcome with a message the
    /// gateway can log.
    #[instrument(skip(self, event, raw_body, signature), fields(event_type = %event.event))]
    pub async fn process(
        &self,
        event: &PaymentEvent,
        raw_body: &[u8],
        signature: &str,
    ) -> WebhookOutcome {
        let correlation_id = Uuid::new_v4().to_string();

        let signature_valid =
            service_core::signature::verify_payload(self.secret.expose_secret(), raw_body, signature)
                .unwrap_or(false);
        if !signature_valid {
            self.reject_with_audit(
                event,
                &correlation_id,
                "WEBHOOK_SIGNATURE_INVALID",
                "Invalid webhook signature",
                AuditSeverity::Warning,
            )
            .await;
            return self.failure("Invalid signature", &correlation_id);
        }

        let invoice = match self.invoices.by_number(&event.invoice_id).await {
            Ok(Some(invoice)) => invoice,
            Ok(None) => {
                self.reject_with_audit(
                    event,
                    &correlation_id,
                    "WEBHOOK_INVOICE_NOT_FOUND",
                    &format!("Invoice not found: {}", event.invoice_id),
                    AuditSeverity::Warning,
                )
                .await;
                return self.failure("Invoice not found", &correlation_id);
            }
            Err(e) => {
                tracing::error!(error = %e, "Invoice lookup failed during reconciliation");
                self.reject_with_audit(
                    event,
                    &correlation_id,
                    "WEBHOOK_ERROR",
                    &format!("Webhook processing error: {}", e),
                    AuditSeverity::Error,
                )
                .await;
                return self.failure("Internal processing error", &correlation_id);
            }
        };

        // Tenant isolation guard. A correctly guessed invoice number must
        // never let one tenant mutate another tenant's invoice.
        if invoice.tenant_id != event.tenant_id {
            self.reject_with_audit(
                event,
                &correlation_id,
                "WEBHOOK_TENANT_MISMATCH",
                &format!("Tenant mismatch for invoice {}", event.invoice_id),
                AuditSeverity::Error,
            )
            .await;
            return self.failure("Tenant mismatch", &correlation_id);
        }

        let applied = match event.event.to_lowercase().as_str() {
            "invoice.paid" => self.apply_paid(invoice, event, &correlation_id).await,
            "payment_failed" | "invoice.payment_failed" => {
                self.apply_payment_failed(invoice, event, &correlation_id).await
            }
            other => {
                self.reject_with_audit(
                    event,
                    &correlation_id,
                    "WEBHOOK_UNKNOWN_EVENT",
                    &format!("Unknown webhook event: {}", other),
                    AuditSeverity::Warning,
                )
                .await;
                return self.failure("Unknown event type", &correlation_id);
            }
        };

        match applied {
            Ok(()) => {
                if let Some(counter) = WEBHOOK_EVENTS_TOTAL.get() {
                    counter
                        .with_label_values(&[event.event.as_str(), "processed"])
                        .inc();
                }
                WebhookOutcome {
                    success: true,
                    message: "Webhook processed successfully".to_string(),
                    processed_at: Some(Utc::now().to_rfc3339()),
                    correlation_id,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to apply webhook event");
                self.reject_with_audit(
                    event,
                    &correlation_id,
                    "WEBHOOK_ERROR",
                    &format!("Webhook processing error: {}", e),
                    AuditSeverity::Error,
                )
                .await;
                self.failure("Internal processing error", &correlation_id)
            }
        }
    }

    /// Mark the invoice paid. Replaying an identical delivery rewrites the
    /// same values, so duplicate `invoice.paid` events are harmless.
    async fn apply_paid(
        &self,
        invoice: Invoice,
        event: &PaymentEvent,
        correlation_id: &str,
    ) -> Result<(), service_core::error::AppError> {
        let now = Utc::now();
        let mut updated = invoice.clone();
        updated.status = InvoiceStatus::Paid;
        updated.paid_date = event.payment_date.or(invoice.paid_date).or(Some(now));
        updated.payment_method = Some(
            event
                .payment_method
                .clone()
                .unwrap_or_else(|| "gateway".to_string()),
        );
        updated.payment_transaction_id = event.transaction_id.clone();
        updated.updated_utc = now;

        self.invoices.replace(updated.clone()).await?;

        let mut new_values: HashMap<String, serde_json::Value> = HashMap::new();
        new_values.insert("status".into(), serde_json::json!("paid"));
        new_values.insert(
            "paid_date".into(),
            serde_json::json!(updated.paid_date.map(|d| d.to_rfc3339())),
        );
        new_values.insert(
            "payment_method".into(),
            serde_json::json!(updated.payment_method),
        );
        new_values.insert(
            "transaction_id".into(),
            serde_json::json!(updated.payment_transaction_id),
        );
        new_values.insert("amount_paid".into(), serde_json::json!(event.amount_paid));
        new_values.insert("currency".into(), serde_json::json!(event.currency));

        self.audit
            .record(AuditEntry {
                tenant_id: invoice.tenant_id.clone(),
                user_id: "webhook".to_string(),
                action: "INVOICE_PAID".to_string(),
                entity_type: "Invoice".to_string(),
                entity_id: Some(invoice.invoice_id.to_string()),
                description: Some(format!(
                    "Invoice {} marked as paid via webhook",
                    invoice.invoice_number
                )),
                correlation_id: Some(correlation_id.to_string()),
                new_values: Some(new_values),
                ..Default::default()
            })
            .await;

        Ok(())
    }

    async fn apply_payment_failed(
        &self,
        invoice: Invoice,
        _event: &PaymentEvent,
        correlation_id: &str,
    ) -> Result<(), service_core::error::AppError> {
        let now = Utc::now();
        let mut updated = invoice.clone();
        updated.status = InvoiceStatus::Failed;
        schedule_payment_retry(&mut updated, now);
        updated.updated_utc = now;

        self.invoices.replace(updated.clone()).await?;

        let mut new_values: HashMap<String, serde_json::Value> = HashMap::new();
        new_values.insert("status".into(), serde_json::json!("failed"));
        new_values.insert(
            "payment_retry_count".into(),
            serde_json::json!(updated.payment_retry_count),
        );
        new_values.insert(
            "next_retry_date".into(),
            serde_json::json!(updated.next_retry_date.map(|d| d.to_rfc3339())),
        );

        self.audit
            .record(AuditEntry {
                tenant_id: invoice.tenant_id.clone(),
                user_id: "webhook".to_string(),
                action: "PAYMENT_FAILED".to_string(),
                entity_type: "Invoice".to_string(),
                entity_id: Some(invoice.invoice_id.to_string()),
                description: Some(format!(
                    "Payment failed for invoice {}. Retry count: {}",
                    invoice.invoice_number, updated.payment_retry_count
                )),
                severity: Some(AuditSeverity::Warning),
                correlation_id: Some(correlation_id.to_string()),
                new_values: Some(new_values),
                ..Default::default()
            })
            .await;

        Ok(())
    }

    async fn reject_with_audit(
        &self,
        event: &PaymentEvent,
        correlation_id: &str,
        action: &str,
        description: &str,
        severity: AuditSeverity,
    ) {
        if let Some(counter) = WEBHOOK_EVENTS_TOTAL.get() {
            counter
                .with_label_values(&[event.event.as_str(), "rejected"])
                .inc();
        }
        self.audit
            .record(AuditEntry {
                tenant_id: event.tenant_id.clone(),
                user_id: "webhook".to_string(),
                action: action.to_string(),
                entity_type: "Webhook".to_string(),
                description: Some(description.to_string()),
                severity: Some(severity),
                correlation_id: Some(correlation_id.to_string()),
                ..Default::default()
            })
            .await;
    }

    fn failure(&self, message: &str, correlation_id: &str) -> WebhookOutcome {
        WebhookOutcome {
            success: false,
            message: message.to_string(),
            processed_at: None,
            correlation_id: correlation_id.to_string(),
        }
    }
}
