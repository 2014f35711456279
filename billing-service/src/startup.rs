//! Application startup and lifecycle management.

use crate::admission::AdmissionController;
use crate::config::BillingConfig;
use crate::handlers::{audit, invoices, jobs, plans, subscriptions, webhooks};
use crate::jobs::spawn_recurring_sweeps;
use crate::middleware::admission_middleware;
use crate::services::{
    get_metrics, AuditTrail, FlatRateTax, InvoiceEngine, PlanCatalog, SubscriptionEngine,
    WebhookReconciler,
};
use crate::store::{AuditStore, InvoiceStore, MemoryStore, PlanStore, SubscriptionStore, TenantStore};
use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BillingConfig,
    pub catalog: PlanCatalog,
    pub subscriptions: SubscriptionEngine,
    pub invoices: InvoiceEngine,
    pub webhooks: WebhookReconciler,
    pub audit: AuditTrail,
    pub admission: Arc<AdmissionController>,
}

/// Health check endpoint for liveness probes.
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "billing-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint.
async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

/// Prometheus metrics endpoint.
async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with a fresh in-memory store.
    pub async fn build(config: BillingConfig) -> Result<Self, AppError> {
        Self::with_store(config, Arc::new(MemoryStore::new())).await
    }

    /// Build the application over an existing store. Tests use this to seed
    /// tenants and plans before the server starts.
    pub async fn with_store(
        config: BillingConfig,
        store: Arc<MemoryStore>,
    ) -> Result<Self, AppError> {
        let tenant_store: Arc<dyn TenantStore> = store.clone();
        let plan_store: Arc<dyn PlanStore> = store.clone();
        let subscription_store: Arc<dyn SubscriptionStore> = store.clone();
        let invoice_store: Arc<dyn InvoiceStore> = store.clone();
        let audit_store: Arc<dyn AuditStore> = store.clone();

        let audit = AuditTrail::new(audit_store);
        let catalog = PlanCatalog::new(plan_store.clone());
        let invoices = InvoiceEngine::new(
            invoice_store.clone(),
            subscription_store.clone(),
            plan_store.clone(),
            Arc::new(FlatRateTax::default()),
            audit.clone(),
        );
        let subscriptions = SubscriptionEngine::new(
            subscription_store,
            plan_store,
            tenant_store.clone(),
            invoices.clone(),
            audit.clone(),
        );
        let webhooks = WebhookReconciler::new(
            invoice_store,
            audit.clone(),
            config.webhook.secret.clone(),
        );
        let admission = Arc::new(AdmissionController::new(
            tenant_store,
            config.admission.default_max_requests_per_minute,
        ));

        let state = AppState {
            config: config.clone(),
            catalog,
            subscriptions,
            invoices,
            webhooks,
            audit,
            admission,
        };

        // Port 0 binds a random port for testing.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Billing service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the application state.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        if self.state.config.scheduler.enabled {
            spawn_recurring_sweeps(self.state.clone());
        }

        let router = build_router(self.state);
        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}

fn build_router(state: AppState) -> Router {
    // Admission applies to tenant-facing routes only; probes and metrics
    // stay reachable under load shedding.
    let api = Router::new()
        .route("/api/plans", get(plans::list_plans))
        .route("/api/plans/:plan_id", get(plans::get_plan))
        .route(
            "/api/subscriptions",
            post(subscriptions::create_subscription),
        )
        .route(
            "/api/subscriptions/:subscription_id",
            get(subscriptions::get_subscription).put(subscriptions::update_subscription),
        )
        .route(
            "/api/subscriptions/:subscription_id/cancel",
            post(subscriptions::cancel_subscription),
        )
        .route(
            "/api/subscriptions/:subscription_id/invoices",
            post(invoices::generate_invoice).get(invoices::list_subscription_invoices),
        )
        .route(
            "/api/tenants/:tenant_id/subscriptions",
            get(subscriptions::list_tenant_subscriptions),
        )
        .route(
            "/api/tenants/:tenant_id/subscriptions/active",
            get(subscriptions::get_active_subscription),
        )
        .route("/api/invoices", post(invoices::create_invoice))
        .route("/api/invoices/:invoice_id", get(invoices::get_invoice))
        .route(
            "/api/invoices/:invoice_id/status",
            put(invoices::update_invoice_status),
        )
        .route(
            "/api/tenants/:tenant_id/invoices",
            get(invoices::list_tenant_invoices),
        )
        .route(
            "/api/tenants/:tenant_id/audit-logs",
            get(audit::list_tenant_audit_logs),
        )
        .route("/api/webhooks/payment", post(webhooks::payment_webhook))
        .route("/api/jobs/billing-sweep", post(jobs::run_billing_sweep))
        .route("/api/jobs/overdue-sweep", post(jobs::run_overdue_sweep))
        .route("/api/jobs/retry-sweep", post(jobs::run_retry_sweep))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
