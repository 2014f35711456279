//! Pricing plan model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Billing cycle. The numeric value is the number of months per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::SemiAnnually => "semi_annually",
            BillingCycle::Annually => "annually",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "quarterly" => BillingCycle::Quarterly,
            "semi_annually" => BillingCycle::SemiAnnually,
            "annually" => BillingCycle::Annually,
            _ => BillingCycle::Monthly,
        }
    }

    /// Number of months covered by one cycle.
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::SemiAnnually => 6,
            BillingCycle::Annually => 12,
        }
    }
}

/// Pricing plan. Immutable once referenced by a live subscription except for
/// administrative deactivation; subscriptions keep their own price snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub billing_cycle: BillingCycle,
    pub is_active: bool,
    /// Feature flags and limits, opaque to the engine.
    pub features: HashMap<String, serde_json::Value>,
    pub max_users: Option<i32>,
    pub max_storage_gb: Option<i64>,
    pub max_api_calls_per_month: Option<i32>,
    pub trial_days: Option<i64>,
    pub plan_code: Option<String>,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}
