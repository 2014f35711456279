//! Invoice model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Invoice status. `Paid` and `Cancelled` are terminal; `Failed` and
/// `Overdue` can still move toward `Paid` via reconciliation or retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
    Failed,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Failed => "failed",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "draft" => InvoiceStatus::Draft,
            "paid" => InvoiceStatus::Paid,
            "failed" => InvoiceStatus::Failed,
            "overdue" => InvoiceStatus::Overdue,
            "cancelled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Pending,
        }
    }
}

/// Line item on an invoice. `total_price` is always
/// `quantity * unit_price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

/// Invoice. Never deleted. `total_amount == amount + tax_amount` holds as an
/// invariant after every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: Uuid,
    /// Globally unique, formatted `INV-YYYYMM-NNNN`.
    pub invoice_number: String,
    pub tenant_id: String,
    pub subscription_id: Uuid,
    pub status: InvoiceStatus,
    pub amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub line_items: Vec<InvoiceLineItem>,
    pub payment_method: Option<String>,
    pub payment_transaction_id: Option<String>,
    pub notes: Option<String>,
    pub payment_retry_count: i32,
    pub next_retry_date: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Line item in a manual invoice creation request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLineItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub description: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

/// Request body for manual invoice creation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, max = 50))]
    pub tenant_id: String,
    pub subscription_id: Uuid,
    pub amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub due_date: DateTime<Utc>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(nested)]
    pub line_items: Vec<CreateLineItemRequest>,
}

/// Request body for invoice status updates.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateInvoiceStatusRequest {
    pub status: InvoiceStatus,
    #[validate(length(max = 100))]
    pub payment_method: Option<String>,
    #[validate(length(max = 100))]
    pub payment_transaction_id: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}
