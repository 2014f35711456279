use billing_service::config::BillingConfig;
use billing_service::services::init_metrics;
use billing_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BillingConfig::load()?;

    init_tracing(&config.service_name, &config.log_level);
    init_metrics();

    let app = Application::build(config).await?;
    app.run_until_stopped().await?;

    Ok(())
}
