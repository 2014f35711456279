//! Admission control integration tests.

mod common;

use common::{TestApp, TENANT_ALPHA, TENANT_LIMITED};

#[tokio::test]
async fn requests_over_the_tenant_ceiling_get_429() {
    let app = TestApp::spawn().await;

    // The limited tenant allows three requests per minute.
    for _ in 0..3 {
        let response = app.get("/api/plans", TENANT_LIMITED).await;
        assert_eq!(response.status(), 200);
    }

    let response = app.get("/api/plans", TENANT_LIMITED).await;
    assert_eq!(response.status(), 429);
    assert_eq!(
        response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok()),
        Some("60")
    );
}

#[tokio::test]
async fn tenants_are_admitted_independently() {
    let app = TestApp::spawn().await;

    // Exhaust the limited tenant.
    for _ in 0..4 {
        app.get("/api/plans", TENANT_LIMITED).await;
    }
    assert_eq!(app.get("/api/plans", TENANT_LIMITED).await.status(), 429);

    // Another tenant is unaffected.
    assert_eq!(app.get("/api/plans", TENANT_ALPHA).await.status(), 200);
}

#[tokio::test]
async fn rejected_requests_do_not_consume_capacity_forever() {
    let app = TestApp::spawn().await;

    // Hammer well past the ceiling; every rejection must leave the recorded
    // window at the ceiling, not grow it.
    for _ in 0..10 {
        app.get("/api/plans", TENANT_LIMITED).await;
    }
    let response = app.get("/api/plans", TENANT_LIMITED).await;
    assert_eq!(response.status(), 429);
}

#[tokio::test]
async fn unattributed_requests_fall_back_to_client_address_keys() {
    let app = TestApp::spawn().await;

    // No tenant header: the forwarded-for chain identifies the client and
    // the default ceiling applies.
    let response = app
        .client
        .get(format!("{}/api/plans", app.address))
        .header("X-Forwarded-For", "198.51.100.9, 10.0.0.1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .get(format!("{}/api/plans", app.address))
        .header("X-Real-IP", "198.51.100.10")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn probes_are_exempt_from_admission() {
    let app = TestApp::spawn().await;

    // Exhaust a tenant, then verify the probes still answer.
    for _ in 0..5 {
        app.get("/api/plans", TENANT_LIMITED).await;
    }

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
