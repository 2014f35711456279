//! Plan catalog reads.

use crate::models::Plan;
use crate::store::PlanStore;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct PlanCatalog {
    plans: Arc<dyn PlanStore>,
}

impl PlanCatalog {
    pub fn new(plans: Arc<dyn PlanStore>) -> Self {
        Self { plans }
    }

    /// Active plans, ordered by sort key then price, ascending.
    pub async fn active_plans(&self) -> Result<Vec<Plan>, AppError> {
        self.plans.active_plans().await
    }

    pub async fn plan_by_id(&self, plan_id: Uuid) -> Result<Plan, AppError> {
        self.plans
            .get(plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Plan '{}' was not found", plan_id)))
    }
}
