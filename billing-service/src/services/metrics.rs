//! Prometheus metrics for the billing engine.

use prometheus::{opts, register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};
use std::sync::OnceLock;

/// Subscription operations counter (per-tenant metering)
pub static SUBSCRIPTION_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Invoices issued counter (per-tenant metering)
pub static INVOICES_ISSUED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Billing sweep item outcomes
pub static BILLING_SWEEP_ITEMS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Overdue/retry sweep item outcomes
pub static DUNNING_SWEEP_ITEMS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Webhook deliveries by event type and outcome
pub static WEBHOOK_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Admission decisions by outcome
pub static ADMISSION_DECISIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    SUBSCRIPTION_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_subscription_operations_total",
                "Total subscription operations by tenant and operation type"
            ),
            &["tenant_id", "operation"]
        )
        .expect("Failed to register SUBSCRIPTION_OPERATIONS_TOTAL")
    });

    INVOICES_ISSUED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_invoices_issued_total",
                "Total invoices issued by tenant and origin"
            ),
            &["tenant_id", "origin"]
        )
        .expect("Failed to register INVOICES_ISSUED_TOTAL")
    });

    BILLING_SWEEP_ITEMS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_sweep_items_total",
                "Billing sweep items by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register BILLING_SWEEP_ITEMS_TOTAL")
    });

    DUNNING_SWEEP_ITEMS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_dunning_sweep_items_total",
                "Overdue and retry sweep items by sweep and outcome"
            ),
            &["sweep", "outcome"]
        )
        .expect("Failed to register DUNNING_SWEEP_ITEMS_TOTAL")
    });

    WEBHOOK_EVENTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_webhook_events_total",
                "Webhook deliveries by event type and outcome"
            ),
            &["event", "outcome"]
        )
        .expect("Failed to register WEBHOOK_EVENTS_TOTAL")
    });

    ADMISSION_DECISIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_admission_decisions_total",
                "Admission control decisions by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register ADMISSION_DECISIONS_TOTAL")
    });
}

/// Render the default registry in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
