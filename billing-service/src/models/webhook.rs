//! Payment gateway webhook payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Externally reported payment outcome, delivered by the gateway.
///
/// `invoice_id` carries the human-readable invoice number, not the internal
/// id; gateways only ever see the number printed on the invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub event: String,
    pub invoice_id: String,
    pub tenant_id: String,
    pub amount_paid: Decimal,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Result returned to the gateway. The correlation id lets the gateway tie
/// retried deliveries to earlier attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
    pub correlation_id: String,
}
