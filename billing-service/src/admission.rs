//! Per-tenant admission control.
//!
//! A sliding 60-second window of request timestamps per tenant key. The key
//! map is a `DashMap`, so checks for distinct tenants land on different
//! shards and only a single tenant's requests contend on one window mutex.
//!
//! The ceiling for a key is resolved once, on first observation, from the
//! tenant directory and then cached for the life of the process; changing a
//! tenant's configured limit does not affect keys already seen.

use crate::services::metrics::ADMISSION_DECISIONS_TOTAL;
use crate::store::TenantStore;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Window length, and the retry hint handed back on rejection.
pub const WINDOW_SECONDS: i64 = 60;

/// Fallback ceiling for unknown tenants and unauthenticated clients.
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct AdmissionDecision {
    pub admitted: bool,
    /// Effective ceiling for the key, for `Retry-After`-style responses.
    pub limit: u32,
    pub retry_after_seconds: u64,
}

struct TenantWindow {
    limit: u32,
    requests: Mutex<VecDeque<DateTime<Utc>>>,
}

impl TenantWindow {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            requests: Mutex::new(VecDeque::new()),
        }
    }

    /// Evict entries older than the window, then admit and record unless the
    /// ceiling is reached. Rejected requests are not recorded.
    fn try_admit(&self, now: DateTime<Utc>) -> bool {
        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let cutoff = now - Duration::seconds(WINDOW_SECONDS);
        while requests.front().is_some_and(|t| *t < cutoff) {
            requests.pop_front();
        }

        if requests.len() as u32 >= self.limit {
            return false;
        }

        requests.push_back(now);
        true
    }
}

/// Owned admission component: construct once at startup and hand out by
/// reference. No process-wide statics.
pub struct AdmissionController {
    windows: DashMap<String, Arc<TenantWindow>>,
    tenants: Arc<dyn TenantStore>,
    default_limit: u32,
}

impl AdmissionController {
    pub fn new(tenants: Arc<dyn TenantStore>, default_limit: u32) -> Self {
        Self {
            windows: DashMap::new(),
            tenants,
            default_limit,
        }
    }

    /// Decide whether a request under `key` may proceed.
    pub async fn check(&self, key: &str) -> AdmissionDecision {
        self.check_at(key, Utc::now()).await
    }

    async fn check_at(&self, key: &str, now: DateTime<Utc>) -> AdmissionDecision {
        let window = match self.windows.get(key) {
            Some(window) => window.clone(),
            None => {
                // First sighting of this key: look up the tenant's ceiling
                // before inserting, so the directory call happens outside
                // any map guard.
                let limit = match self.tenants.get(key).await {
                    Ok(Some(tenant)) => tenant.max_requests_per_minute,
                    Ok(None) => self.default_limit,
                    Err(e) => {
                        tracing::warn!(key, error = %e, "Tenant lookup failed; using default admission ceiling");
                        self.default_limit
                    }
                };
                self.windows
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(TenantWindow::new(limit)))
                    .clone()
            }
        };

        let admitted = window.try_admit(now);

        if let Some(counter) = ADMISSION_DECISIONS_TOTAL.get() {
            let outcome = if admitted { "admitted" } else { "rejected" };
            counter.with_label_values(&[outcome]).inc();
        }

        if !admitted {
            tracing::warn!(
                key,
                limit = window.limit,
                "Rate limit exceeded"
            );
        }

        AdmissionDecision {
            admitted,
            limit: window.limit,
            retry_after_seconds: WINDOW_SECONDS as u64,
        }
    }
}
