//! Webhook reconciliation integration tests.

mod common;

use billing_service::models::InvoiceStatus;
use billing_service::store::InvoiceStore;
use chrono::{Duration, Utc};
use common::{TestApp, TENANT_ALPHA, TENANT_BETA};
use uuid::Uuid;

/// Generate an invoice and return `(invoice_id, invoice_number)`.
async fn generated_invoice(app: &TestApp) -> (Uuid, String) {
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
    let invoice: serde_json::Value = response.json().await.unwrap();
    (
        invoice["invoice_id"].as_str().unwrap().parse().unwrap(),
        invoice["invoice_number"].as_str().unwrap().to_string(),
    )
}

fn paid_event(invoice_number: &str, tenant_id: &str) -> serde_json::Value {
    serde_json::json!({
        "event": "invoice.paid",
        "invoice_id": invoice_number,
        "tenant_id": tenant_id,
        "amount_paid": "32.99",
        "payment_method": "card",
        "transaction_id": "txn_8841",
        "payment_date": "2026-08-01T10:00:00Z"
    })
}

fn failed_event(invoice_number: &str, tenant_id: &str) -> serde_json::Value {
    serde_json::json!({
        "event": "payment_failed",
        "invoice_id": invoice_number,
        "tenant_id": tenant_id,
        "amount_paid": "0.00"
    })
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_mutation() {
    let app = TestApp::spawn().await;
    let (invoice_id, number) = generated_invoice(&app).await;

    let response = app
        .post_webhook_with_signature(&paid_event(&number, TENANT_ALPHA), "sha256=deadbeef")
        .await;
    assert_eq!(response.status(), 200);
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["message"], "Invalid signature");
    assert!(!outcome["correlation_id"].as_str().unwrap().is_empty());

    let invoice = InvoiceStore::get(app.store.as_ref(), invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert!(invoice.paid_date.is_none());
}

#[tokio::test]
async fn unknown_invoice_number_is_reported() {
    let app = TestApp::spawn().await;
    generated_invoice(&app).await;

    let response = app
        .post_webhook(&paid_event("INV-209901-0042", TENANT_ALPHA))
        .await;
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["message"], "Invoice not found");
}

#[tokio::test]
async fn tenant_mismatch_leaves_the_invoice_untouched() {
    let app = TestApp::spawn().await;
    let (invoice_id, number) = generated_invoice(&app).await;

    // Correct invoice number, wrong tenant: the isolation guard holds even
    // when the number is guessed.
    let response = app.post_webhook(&paid_event(&number, TENANT_BETA)).await;
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["message"], "Tenant mismatch");

    let invoice = InvoiceStore::get(app.store.as_ref(), invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert!(invoice.paid_date.is_none());
    assert!(invoice.payment_transaction_id.is_none());
    assert_eq!(invoice.payment_retry_count, 0);
}

#[tokio::test]
async fn paid_event_marks_the_invoice_paid() {
    let app = TestApp::spawn().await;
    let (invoice_id, number) = generated_invoice(&app).await;

    let response = app.post_webhook(&paid_event(&number, TENANT_ALPHA)).await;
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], true);
    assert!(outcome["processed_at"].as_str().is_some());

    let invoice = InvoiceStore::get(app.store.as_ref(), invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(
        invoice.paid_date.unwrap().to_rfc3339(),
        "2026-08-01T10:00:00+00:00"
    );
    assert_eq!(invoice.payment_method.as_deref(), Some("card"));
    assert_eq!(invoice.payment_transaction_id.as_deref(), Some("txn_8841"));
    // Totals are untouched by reconciliation.
    assert_eq!(invoice.total_amount, invoice.amount + invoice.tax_amount);
}

#[tokio::test]
async fn paid_event_replay_is_idempotent() {
    let app = TestApp::spawn().await;
    let (invoice_id, number) = generated_invoice(&app).await;
    let event = paid_event(&number, TENANT_ALPHA);

    app.post_webhook(&event).await;
    let first = InvoiceStore::get(app.store.as_ref(), invoice_id)
        .await
        .unwrap()
        .unwrap();

    // Identical delivery again.
    let response = app.post_webhook(&event).await;
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], true);

    let second = InvoiceStore::get(app.store.as_ref(), invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.status, first.status);
    assert_eq!(second.paid_date, first.paid_date);
    assert_eq!(second.payment_method, first.payment_method);
    assert_eq!(second.payment_transaction_id, first.payment_transaction_id);
}

#[tokio::test]
async fn payment_failed_schedules_backoff() {
    let app = TestApp::spawn().await;
    let (invoice_id, number) = generated_invoice(&app).await;

    let response = app.post_webhook(&failed_event(&number, TENANT_ALPHA)).await;
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], true);

    let invoice = InvoiceStore::get(app.store.as_ref(), invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Failed);
    assert_eq!(invoice.payment_retry_count, 1);
    let delta = invoice.next_retry_date.unwrap() - Utc::now();
    assert!(
        (delta - Duration::days(2)).num_minutes().abs() <= 1,
        "expected ~2 days of backoff"
    );
}

#[tokio::test]
async fn repeated_failures_exhaust_retries_but_keep_counting() {
    let app = TestApp::spawn().await;
    let (invoice_id, number) = generated_invoice(&app).await;
    let event = failed_event(&number, TENANT_ALPHA);

    app.post_webhook(&event).await;
    app.post_webhook(&event).await;
    app.post_webhook(&event).await;

    let invoice = InvoiceStore::get(app.store.as_ref(), invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.payment_retry_count, 3);
    assert_eq!(invoice.next_retry_date, None);

    // A fourth failure still increments the counter; no retry is scheduled.
    app.post_webhook(&event).await;
    let invoice = InvoiceStore::get(app.store.as_ref(), invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.payment_retry_count, 4);
    assert_eq!(invoice.next_retry_date, None);
}

#[tokio::test]
async fn unknown_event_types_are_rejected_without_mutation() {
    let app = TestApp::spawn().await;
    let (invoice_id, number) = generated_invoice(&app).await;

    let response = app
        .post_webhook(&serde_json::json!({
            "event": "customer.updated",
            "invoice_id": number,
            "tenant_id": TENANT_ALPHA,
            "amount_paid": "0.00"
        }))
        .await;
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["message"], "Unknown event type");

    let invoice = InvoiceStore::get(app.store.as_ref(), invoice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
}

#[tokio::test]
async fn every_delivery_is_audited_with_its_correlation_id() {
    let app = TestApp::spawn().await;
    let (_, number) = generated_invoice(&app).await;

    let response = app.post_webhook(&paid_event(&number, TENANT_BETA)).await;
    let outcome: serde_json::Value = response.json().await.unwrap();
    let correlation_id = outcome["correlation_id"].as_str().unwrap().to_string();

    let response = app
        .get(
            &format!("/api/tenants/{}/audit-logs", TENANT_BETA),
            TENANT_BETA,
        )
        .await;
    assert_eq!(response.status(), 200);
    let logs: serde_json::Value = response.json().await.unwrap();
    let found = logs["items"].as_array().unwrap().iter().any(|item| {
        item["action"] == "WEBHOOK_TENANT_MISMATCH"
            && item["correlation_id"] == serde_json::json!(correlation_id)
    });
    assert!(found, "expected an audited tenant-mismatch record");
}

#[tokio::test]
async fn malformed_payloads_are_a_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/api/webhooks/payment", app.address))
        .header("X-Webhook-Signature", "sha256=ignored")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
