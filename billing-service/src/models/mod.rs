//! Domain models for the billing engine.

mod audit;
mod invoice;
mod plan;
mod subscription;
mod tenant;
mod webhook;

pub use audit::{AuditEntry, AuditLog, AuditQuery, AuditSeverity};
pub use invoice::{
    CreateInvoiceRequest, CreateLineItemRequest, Invoice, InvoiceLineItem, InvoiceStatus,
    UpdateInvoiceStatusRequest,
};
pub use plan::{BillingCycle, Plan};
pub use subscription::{
    CancelSubscriptionRequest, CreateSubscriptionRequest, Subscription, SubscriptionStatus,
    UpdateSubscriptionRequest,
};
pub use tenant::Tenant;
pub use webhook::{PaymentEvent, WebhookOutcome};
