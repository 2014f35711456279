//! Subscription model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    PendingActivation,
    Active,
    Inactive,
    Suspended,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::PendingActivation => "pending_activation",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "pending_activation" => SubscriptionStatus::PendingActivation,
            "inactive" => SubscriptionStatus::Inactive,
            "suspended" => SubscriptionStatus::Suspended,
            "cancelled" => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::Active,
        }
    }
}

/// Subscription. Never physically deleted; cancellation is a status
/// transition with timestamping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_id: Uuid,
    /// Business identifier of the owning tenant.
    pub tenant_id: String,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    /// Authoritative trigger for the next billing sweep pass.
    pub next_billing_date: DateTime<Utc>,
    /// Price snapshot taken at creation; plan price changes do not affect it.
    pub current_price: Decimal,
    pub is_trial_active: bool,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub last_billed_date: Option<DateTime<Utc>>,
    pub billing_cycle_count: i32,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Request body for creating a subscription.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    #[validate(length(min = 1, max = 50))]
    pub tenant_id: String,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_trial: bool,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Request body for updating a subscription.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSubscriptionRequest {
    pub status: SubscriptionStatus,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Request body for cancelling a subscription.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelSubscriptionRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}
