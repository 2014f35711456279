//! Tenant model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tenant: an isolated customer account, the unit of data partitioning and
/// rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique business identifier, referenced by subscriptions and invoices.
    pub tenant_id: String,
    pub name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub is_active: bool,
    pub settings: HashMap<String, serde_json::Value>,
    /// Admission ceiling for this tenant's API traffic.
    pub max_requests_per_minute: u32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}
