//! Test helper module for billing-service integration tests.
//!
//! Spawns the application on a random port over a seeded in-memory store
//! and drives it through the HTTP surface with reqwest.

#![allow(dead_code)]

use billing_service::config::{
    AdmissionConfig, BillingConfig, SchedulerConfig, WebhookConfig,
};
use billing_service::models::{BillingCycle, Plan, Tenant};
use billing_service::services::init_metrics;
use billing_service::startup::Application;
use billing_service::store::{MemoryStore, PlanStore, TenantStore};
use chrono::Utc;
use rust_decimal_macros::dec;
use service_core::config::Config as CoreConfig;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub const TENANT_ALPHA: &str = "tenant-alpha";
pub const TENANT_BETA: &str = "tenant-beta";
/// Tenant with a deliberately tiny admission ceiling.
pub const TENANT_LIMITED: &str = "tenant-limited";

/// Matches the default webhook secret in `WebhookConfig`.
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
    pub monthly_plan_id: Uuid,
    pub annual_plan_id: Uuid,
    pub trial_plan_id: Uuid,
    pub inactive_plan_id: Uuid,
}

fn tenant(id: &str, max_requests_per_minute: u32) -> Tenant {
    let now = Utc::now();
    Tenant {
        tenant_id: id.to_string(),
        name: format!("{} Inc", id),
        contact_email: format!("billing@{}.example.com", id),
        contact_phone: None,
        is_active: true,
        settings: HashMap::new(),
        max_requests_per_minute,
        created_utc: now,
        updated_utc: now,
    }
}

fn plan(
    name: &str,
    price: rust_decimal::Decimal,
    cycle: BillingCycle,
    trial_days: Option<i64>,
    is_active: bool,
    sort_order: i32,
) -> Plan {
    let now = Utc::now();
    Plan {
        plan_id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        price,
        billing_cycle: cycle,
        is_active,
        features: HashMap::new(),
        max_users: Some(25),
        max_storage_gb: Some(100),
        max_api_calls_per_month: Some(100_000),
        trial_days,
        plan_code: Some(name.to_lowercase().replace(' ', "-")),
        sort_order,
        created_utc: now,
        updated_utc: now,
    }
}

impl TestApp {
    /// Spawn a new test application on a random port.
    pub async fn spawn() -> Self {
        init_metrics();

        let store = Arc::new(MemoryStore::new());

        TenantStore::create(store.as_ref(), tenant(TENANT_ALPHA, 100))
            .await
            .expect("Failed to seed tenant");
        TenantStore::create(store.as_ref(), tenant(TENANT_BETA, 100))
            .await
            .expect("Failed to seed tenant");
        TenantStore::create(store.as_ref(), tenant(TENANT_LIMITED, 3))
            .await
            .expect("Failed to seed tenant");

        let monthly = plan("Starter", dec!(29.99), BillingCycle::Monthly, None, true, 1);
        let annual = plan("Growth Annual", dec!(299.00), BillingCycle::Annually, None, true, 2);
        let trial = plan(
            "Pro Trial",
            dec!(99.00),
            BillingCycle::Monthly,
            Some(14),
            true,
            3,
        );
        let inactive = plan("Legacy", dec!(9.99), BillingCycle::Monthly, None, false, 4);

        let monthly_plan_id = monthly.plan_id;
        let annual_plan_id = annual.plan_id;
        let trial_plan_id = trial.plan_id;
        let inactive_plan_id = inactive.plan_id;

        for p in [monthly, annual, trial, inactive] {
            PlanStore::create(store.as_ref(), p)
                .await
                .expect("Failed to seed plan");
        }

        let config = BillingConfig {
            common: CoreConfig { port: 0 },
            service_name: "billing-service-test".to_string(),
            log_level: "warn".to_string(),
            webhook: WebhookConfig::default(),
            admission: AdmissionConfig::default(),
            scheduler: SchedulerConfig::default(),
        };

        let app = Application::with_store(config, store.clone())
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let address = format!("http://127.0.0.1:{}", port);
        let client = reqwest::Client::new();

        // Wait for the server to come up.
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            store,
            client,
            monthly_plan_id,
            annual_plan_id,
            trial_plan_id,
            inactive_plan_id,
        }
    }

    pub async fn get(&self, path: &str, tenant_id: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .header("X-Tenant-ID", tenant_id)
            .header("X-User-ID", "test-user")
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn post_json(
        &self,
        path: &str,
        tenant_id: &str,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .header("X-Tenant-ID", tenant_id)
            .header("X-User-ID", "test-user")
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn put_json(
        &self,
        path: &str,
        tenant_id: &str,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .put(format!("{}{}", self.address, path))
            .header("X-Tenant-ID", tenant_id)
            .header("X-User-ID", "test-user")
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Deliver a signed webhook payload.
    pub async fn post_webhook(&self, body: &serde_json::Value) -> reqwest::Response {
        let raw = serde_json::to_vec(body).expect("Failed to serialize webhook body");
        let signature = service_core::signature::sign_payload(WEBHOOK_SECRET, &raw)
            .expect("Failed to sign webhook body");

        self.client
            .post(format!("{}/api/webhooks/payment", self.address))
            .header("X-Webhook-Signature", format!("sha256={}", signature))
            .header("content-type", "application/json")
            .body(raw)
            .send()
            .await
            .expect("Request failed")
    }

    /// Deliver a webhook payload with an arbitrary signature header.
    pub async fn post_webhook_with_signature(
        &self,
        body: &serde_json::Value,
        signature: &str,
    ) -> reqwest::Response {
        let raw = serde_json::to_vec(body).expect("Failed to serialize webhook body");

        self.client
            .post(format!("{}/api/webhooks/payment", self.address))
            .header("X-Webhook-Signature", signature)
            .header("content-type", "application/json")
            .body(raw)
            .send()
            .await
            .expect("Request failed")
    }

    /// Create a subscription for a tenant on a plan and return the response
    /// body.
    pub async fn create_subscription(
        &self,
        tenant_id: &str,
        plan_id: Uuid,
        start_trial: bool,
    ) -> serde_json::Value {
        let response = self
            .post_json(
                "/api/subscriptions",
                tenant_id,
                &serde_json::json!({
                    "tenant_id": tenant_id,
                    "plan_id": plan_id,
                    "start_date": Utc::now().to_rfc3339(),
                    "start_trial": start_trial,
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "Failed to create subscription");
        response.json().await.expect("Invalid subscription body")
    }
}
