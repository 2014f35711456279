//! Recurring sweep scheduler.
//!
//! Cadences follow operations practice for this engine: billing daily,
//! overdue marking every six hours, payment retries twice daily. Each run is
//! bracketed by audit records sharing a per-run correlation id. Sweeps
//! isolate per-item failures internally, so a run only fails here when the
//! "due" selection itself cannot be read.

use crate::models::{AuditEntry, AuditSeverity};
use crate::startup::AppState;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

pub fn spawn_recurring_sweeps(state: AppState) {
    let scheduler = state.config.scheduler.clone();

    spawn_loop(
        state.clone(),
        "billing",
        scheduler.billing_interval_secs,
    );
    spawn_loop(
        state.clone(),
        "overdue",
        scheduler.overdue_interval_secs,
    );
    spawn_loop(
        state.clone(),
        "retry",
        scheduler.retry_interval_secs,
    );
    spawn_audit_cleanup(state);
}

/// Weekly audit retention cleanup.
fn spawn_audit_cleanup(state: AppState) {
    let interval_secs = state.config.scheduler.audit_cleanup_interval_secs;
    let retention_days = state.config.scheduler.audit_retention_days;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match state.audit.purge(retention_days).await {
                Ok(purged) => {
                    tracing::info!(purged, retention_days, "Audit retention cleanup finished");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Audit retention cleanup failed");
                }
            }
        }
    });
}

fn spawn_loop(state: AppState, sweep: &'static str, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it so the initial run
        // waits a full interval after startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_sweep(&state, sweep).await;
        }
    });
}

async fn run_sweep(state: &AppState, sweep: &str) {
    let job_id = Uuid::new_v4().to_string();
    tracing::info!(sweep, job_id = %job_id, "Sweep run started");

    state
        .audit
        .record(AuditEntry {
            tenant_id: "SYSTEM".to_string(),
            user_id: "scheduler".to_string(),
            action: format!("START_{}_SWEEP", sweep.to_uppercase()),
            entity_type: "BackgroundJob".to_string(),
            description: Some(format!("Started {} sweep", sweep)),
            correlation_id: Some(job_id.clone()),
            ..Default::default()
        })
        .await;

    let result = match sweep {
        "billing" => state
            .subscriptions
            .run_billing_sweep()
            .await
            .map(|o| format!("billed {}, failed {}", o.billed, o.failed)),
        "overdue" => state
            .invoices
            .run_overdue_sweep()
            .await
            .map(|o| format!("marked {}, failed {}", o.marked_overdue, o.failed)),
        "retry" => state
            .invoices
            .run_retry_sweep()
            .await
            .map(|o| {
                format!(
                    "scheduled {}, exhausted {}, failed {}",
                    o.scheduled, o.exhausted, o.failed
                )
            }),
        other => {
            tracing::error!(sweep = other, "Unknown sweep kind");
            return;
        }
    };

    match result {
        Ok(summary) => {
            tracing::info!(sweep, job_id = %job_id, %summary, "Sweep run finished");
            state
                .audit
                .record(AuditEntry {
                    tenant_id: "SYSTEM".to_string(),
                    user_id: "scheduler".to_string(),
                    action: format!("COMPLETE_{}_SWEEP", sweep.to_uppercase()),
                    entity_type: "BackgroundJob".to_string(),
                    description: Some(summary),
                    correlation_id: Some(job_id),
                    ..Default::default()
                })
                .await;
        }
        Err(e) => {
            tracing::error!(sweep, job_id = %job_id, error = %e, "Sweep run failed");
            state
                .audit
                .record(AuditEntry {
                    tenant_id: "SYSTEM".to_string(),
                    user_id: "scheduler".to_string(),
                    action: format!("{}_SWEEP_ERROR", sweep.to_uppercase()),
                    entity_type: "BackgroundJob".to_string(),
                    description: Some(format!("Sweep failed: {}", e)),
                    severity: Some(AuditSeverity::Error),
                    correlation_id: Some(job_id),
                    ..Default::default()
                })
                .await;
        }
    }
}
