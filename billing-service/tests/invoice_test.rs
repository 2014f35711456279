//! Invoice engine integration tests.

mod common;

use chrono::{DateTime, Duration, Utc};
use common::{TestApp, TENANT_ALPHA, TENANT_BETA};
use uuid::Uuid;

fn manual_invoice_body(tenant_id: &str, subscription_id: &str) -> serde_json::Value {
    serde_json::json!({
        "tenant_id": tenant_id,
        "subscription_id": subscription_id,
        "amount": "120.00",
        "tax_amount": "12.00",
        "currency": "USD",
        "due_date": (Utc::now() + Duration::days(14)).to_rfc3339(),
        "line_items": [
            {
                "description": "Seat licenses",
                "quantity": 4,
                "unit_price": "30.00"
            }
        ]
    })
}

#[tokio::test]
async fn manual_invoice_computes_totals_and_line_totals() {
    let app = TestApp::spawn().await;
    let subscription = app
        .create_subscription(TENANT_ALPHA, app.monthly_plan_id, false)
        .await;
    let subscription_id = subscription["subscription_id"].as_str().unwrap();

    let response = app
        .post_json(
            "/api/invoices",
            TENANT_ALPHA,
            &manual_invoice_body(TENANT_ALPHA, subscription_id),
        )
        .await;
    assert_eq!(response.status(), 201);
    let invoice: serde_json::Value = response.json().await.unwrap();

    assert_eq!(invoice["status"], "pending");
    assert_eq!(invoice["amount"], "120.00");
    assert_eq!(invoice["tax_amount"], "12.00");
    assert_eq!(invoice["total_amount"], "132.00");
    assert_eq!(invoice["payment_retry_count"], 0);

    let line = &invoice["line_items"][0];
    assert_eq!(line["quantity"], 4);
    assert_eq!(line["total_price"], "120.00");
}

#[tokio::test]
async fn invoice_numbers_are_sequential_within_the_month() {
    let app = TestApp::spawn().await;
    let subscription = app
        .create_subscription(TENANT_ALPHA, app.monthly_plan_id, false)
        .await;
    let subscription_id = subscription["subscription_id"].as_str().unwrap();

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let response = app
            .post_json(
                "/api/invoices",
                TENANT_ALPHA,
                &manual_invoice_body(TENANT_ALPHA, subscription_id),
            )
            .await;
        let invoice: serde_json::Value = response.json().await.unwrap();
        numbers.push(invoice["invoice_number"].as_str().unwrap().to_string());
    }

    let prefix = format!("INV-{}", Utc::now().format("%Y%m"));
    for (i, number) in numbers.iter().enumerate() {
        assert_eq!(*number, format!("{}-{:04}", prefix, i + 1));
    }
}

#[tokio::test]
async fn generated_invoice_covers_the_billing_period() {
    let app = TestApp::spawn().await;
    let subscription = app
        .create_subscription(TENANT_ALPHA, app.monthly_plan_id, false)
        .await;
    let id = subscription["subscription_id"].as_str().unwrap();

    let response = app
        .post_json(
            &format!("/api/subscriptions/{}/invoices", id),
            TENANT_ALPHA,
            &serde_json::json!({}),
        )
        .await;
    assert_eq!(response.status(), 201);
    let invoice: serde_json::Value = response.json().await.unwrap();

    assert_eq!(invoice["amount"], "29.99");
    assert_eq!(invoice["tax_amount"], "3.00");
    assert_eq!(invoice["total_amount"], "32.99");
    assert_eq!(invoice["currency"], "USD");

    // Thirty days to pay.
    let issue: DateTime<Utc> = invoice["issue_date"].as_str().unwrap().parse().unwrap();
    let due: DateTime<Utc> = invoice["due_date"].as_str().unwrap().parse().unwrap();
    assert_eq!((due - issue).num_days(), 30);

    // One line item describing the plan and period.
    let line = &invoice["line_items"][0];
    assert_eq!(line["quantity"], 1);
    assert!(line["description"]
        .as_str()
        .unwrap()
        .contains("Starter"));
    let period_start: DateTime<Utc> = line["period_start"].as_str().unwrap().parse().unwrap();
    let period_end: DateTime<Utc> = line["period_end"].as_str().unwrap().parse().unwrap();
    assert!(period_end > period_start);
}

#[tokio::test]
async fn generating_during_trial_is_a_business_error() {
    let app = TestApp::spawn().await;
    let subscription = app
        .create_subscription(TENANT_ALPHA, app.trial_plan_id, true)
        .await;
    let id = subscription["subscription_id"].as_str().unwrap();

    let response = app
        .post_json(
            &format!("/api/subscriptions/{}/invoices", id),
            TENANT_ALPHA,
            &serde_json::json!({}),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Business rule violation");
}

#[tokio::test]
async fn trial_exit_allows_generation() {
    let app = TestApp::spawn().await;
    let subscription = app
        .create_subscription(TENANT_ALPHA, app.trial_plan_id, true)
        .await;
    let id: Uuid = subscription["subscription_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    // Move the trial end into the past.
    use billing_service::store::SubscriptionStore;
    let mut stored = SubscriptionStore::get(app.store.as_ref(), id)
        .await
        .unwrap()
        .unwrap();
    stored.trial_end_date = Some(Utc::now() - Duration::days(1));
    stored.next_billing_date = Utc::now() - Duration::days(1);
    SubscriptionStore::replace(app.store.as_ref(), stored)
        .await
        .unwrap();

    let response = app
        .post_json(
            &format!("/api/subscriptions/{}/invoices", id),
            TENANT_ALPHA,
            &serde_json::json!({}),
        )
        .await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn marking_paid_stamps_paid_date_once() {
    let app = TestApp::spawn().await;
    let subscription = app
        .create_subscription(TENANT_ALPHA, app.monthly_plan_id, false)
        .await;
    let subscription_id = subscription["subscription_id"].as_str().unwrap();

    let response = app
        .post_json(
            "/api/invoices",
            TENANT_ALPHA,
            &manual_invoice_body(TENANT_ALPHA, subscription_id),
        )
        .await;
    let invoice: serde_json::Value = response.json().await.unwrap();
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let response = app
        .put_json(
            &format!("/api/invoices/{}/status", invoice_id),
            TENANT_ALPHA,
            &serde_json::json!({
                "status": "paid",
                "payment_method": "card",
                "payment_transaction_id": "txn_123"
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let paid: serde_json::Value = response.json().await.unwrap();
    assert_eq!(paid["status"], "paid");
    let paid_date = paid["paid_date"].as_str().unwrap().to_string();

    // A second paid update does not move the stamp.
    let response = app
        .put_json(
            &format!("/api/invoices/{}/status", invoice_id),
            TENANT_ALPHA,
            &serde_json::json!({ "status": "paid" }),
        )
        .await;
    let paid_again: serde_json::Value = response.json().await.unwrap();
    assert_eq!(paid_again["paid_date"].as_str().unwrap(), paid_date);
}

#[tokio::test]
async fn cross_tenant_invoice_access_is_rejected() {
    let app = TestApp::spawn().await;
    let subscription = app
        .create_subscription(TENANT_ALPHA, app.monthly_plan_id, false)
        .await;
    let subscription_id = subscription["subscription_id"].as_str().unwrap();

    let response = app
        .post_json(
            "/api/invoices",
            TENANT_ALPHA,
            &manual_invoice_body(TENANT_ALPHA, subscription_id),
        )
        .await;
    let invoice: serde_json::Value = response.json().await.unwrap();
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let response = app
        .get(&format!("/api/invoices/{}", invoice_id), TENANT_BETA)
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .get(
            &format!("/api/tenants/{}/invoices", TENANT_ALPHA),
            TENANT_BETA,
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn invalid_line_item_quantity_fails_validation() {
    let app = TestApp::spawn().await;
    let subscription = app
        .create_subscription(TENANT_ALPHA, app.monthly_plan_id, false)
        .await;
    let subscription_id = subscription["subscription_id"].as_str().unwrap();

    let mut body = manual_invoice_body(TENANT_ALPHA, subscription_id);
    body["line_items"][0]["quantity"] = serde_json::json!(0);

    let response = app.post_json("/api/invoices", TENANT_ALPHA, &body).await;
    assert_eq!(response.status(), 422);
}
