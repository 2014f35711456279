//! Engine services.

pub mod audit;
pub mod catalog;
pub mod invoices;
pub mod metrics;
pub mod numbering;
pub mod subscriptions;
pub mod tax;
pub mod webhooks;

pub use audit::AuditTrail;
pub use catalog::PlanCatalog;
pub use invoices::{InvoiceEngine, OverdueSweepOutcome, RetrySweepOutcome, MAX_PAYMENT_RETRIES};
pub use metrics::{get_metrics, init_metrics};
pub use numbering::InvoiceSequencer;
pub use subscriptions::{next_billing_date, BillingSweepOutcome, SubscriptionEngine};
pub use tax::{FlatRateTax, TaxStrategy};
pub use webhooks::WebhookReconciler;
