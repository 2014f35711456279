//! Plan catalog integration tests.

mod common;

use common::{TestApp, TENANT_ALPHA};

#[tokio::test]
async fn catalog_lists_active_plans_in_order() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/plans", TENANT_ALPHA).await;
    assert_eq!(response.status(), 200);
    let plans: serde_json::Value = response.json().await.unwrap();
    let plans = plans.as_array().unwrap();

    // The inactive legacy plan is filtered out.
    assert_eq!(plans.len(), 3);
    let names: Vec<&str> = plans.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Starter", "Growth Annual", "Pro Trial"]);
}

#[tokio::test]
async fn plan_lookup_by_id() {
    let app = TestApp::spawn().await;

    let response = app
        .get(&format!("/api/plans/{}", app.trial_plan_id), TENANT_ALPHA)
        .await;
    assert_eq!(response.status(), 200);
    let plan: serde_json::Value = response.json().await.unwrap();
    assert_eq!(plan["name"], "Pro Trial");
    assert_eq!(plan["trial_days"], 14);
    assert_eq!(plan["billing_cycle"], "monthly");

    let response = app
        .get(&format!("/api/plans/{}", uuid::Uuid::new_v4()), TENANT_ALPHA)
        .await;
    assert_eq!(response.status(), 404);
}
