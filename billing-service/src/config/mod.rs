//! Service configuration.

use secrecy::Secret;
use serde::Deserialize;
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    /// Shared secret for payment gateway signatures.
    #[serde(default = "default_webhook_secret")]
    pub secret: Secret<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: default_webhook_secret(),
        }
    }
}

fn default_webhook_secret() -> Secret<String> {
    Secret::new("whsec_test_secret".to_string())
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdmissionConfig {
    /// Ceiling applied to unknown tenants and unauthenticated clients.
    #[serde(default = "default_max_requests_per_minute")]
    pub default_max_requests_per_minute: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            default_max_requests_per_minute: default_max_requests_per_minute(),
        }
    }
}

fn default_max_requests_per_minute() -> u32 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Whether the in-process sweep scheduler runs. Off in tests, where
    /// sweeps are triggered through the admin endpoints.
    #[serde(default)]
    pub enabled: bool,
    /// Billing sweep cadence: daily.
    #[serde(default = "default_billing_interval")]
    pub billing_interval_secs: u64,
    /// Overdue sweep cadence: every six hours.
    #[serde(default = "default_overdue_interval")]
    pub overdue_interval_secs: u64,
    /// Payment retry sweep cadence: twice daily.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
    /// Audit retention cleanup cadence: weekly.
    #[serde(default = "default_audit_cleanup_interval")]
    pub audit_cleanup_interval_secs: u64,
    #[serde(default = "default_audit_retention_days")]
    pub audit_retention_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            billing_interval_secs: default_billing_interval(),
            overdue_interval_secs: default_overdue_interval(),
            retry_interval_secs: default_retry_interval(),
            audit_cleanup_interval_secs: default_audit_cleanup_interval(),
            audit_retention_days: default_audit_retention_days(),
        }
    }
}

fn default_billing_interval() -> u64 {
    86_400
}

fn default_overdue_interval() -> u64 {
    21_600
}

fn default_retry_interval() -> u64 {
    43_200
}

fn default_audit_cleanup_interval() -> u64 {
    604_800
}

fn default_audit_retention_days() -> i64 {
    90
}

#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    #[serde(flatten)]
    pub common: CoreConfig,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_service_name() -> String {
    "billing-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BillingConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
