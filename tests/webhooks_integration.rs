use actix_web::test::TestRequest;
use actix_web::{App, test, web};
use serde_json::json;
use uuid::Uuid;

use praxis::api::webhooks::stripe_webhook;

mod support;

fn completed_event(session_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "payment_status": "paid"
            }
        }
    }))
    .expect("serialize event")
}

fn signed_request(payload: &[u8], secret: &str) -> TestRequest {
    let header = support::stripe_signature(payload, secret, &support::current_timestamp());
    TestRequest::post()
        .uri("/api/payment/webhook")
        .insert_header(("Stripe-Signature", header))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload.to_vec())
}

#[actix_web::test]
async fn completed_event_marks_pending_purchase_paid_and_redelivery_is_idempotent() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let session_id = format!("cs_test_{}", Uuid::new_v4());

    let resource_id =
        support::insert_resource(pool, "Career Guide", "guide.pdf", false, Some("9.99")).await;
    let purchase_id =
        support::insert_purchase(pool, resource_id, "buyer-1", &session_id, false).await;

    let state = web::Data::new(support::build_state(pool.clone(), support::TEST_WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state).service(stripe_webhook)).await;

    let payload = completed_event(&session_id);

    let resp = test::call_service(
        &app,
        signed_request(&payload, support::TEST_WEBHOOK_SECRET).to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    assert!(support::purchase_is_paid(pool, purchase_id).await);

    // Gateways redeliver; reprocessing must not change anything.
    let resp = test::call_service(
        &app,
        signed_request(&payload, support::TEST_WEBHOOK_SECRET).to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    assert!(support::purchase_is_paid(pool, purchase_id).await);
    assert_eq!(support::purchase_count(pool, &session_id).await, 1);
}

#[actix_web::test]
async fn tampered_signature_never_changes_purchase_state() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let session_id = format!("cs_test_{}", Uuid::new_v4());

    let resource_id =
        support::insert_resource(pool, "Coaching Kit", "kit.pdf", false, Some("19.99")).await;
    let purchase_id =
        support::insert_purchase(pool, resource_id, "buyer-1", &session_id, false).await;

    let state = web::Data::new(support::build_state(pool.clone(), support::TEST_WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state).service(stripe_webhook)).await;

    // Body matches a real pending session, but the signature is wrong.
    let payload = completed_event(&session_id);
    let resp = test::call_service(&app, signed_request(&payload, "wrong_secret").to_request()).await;

    assert_eq!(resp.status(), 400);
    assert!(!support::purchase_is_paid(pool, purchase_id).await);
}

#[actix_web::test]
async fn missing_signature_header_is_rejected() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let state = web::Data::new(support::build_state(pool.clone(), support::TEST_WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state).service(stripe_webhook)).await;

    let req = TestRequest::post()
        .uri("/api/payment/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(completed_event("cs_test_whatever"))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn unknown_session_acks_then_later_redelivery_reconciles() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let session_id = format!("cs_test_{}", Uuid::new_v4());

    let state = web::Data::new(support::build_state(pool.clone(), support::TEST_WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state).service(stripe_webhook)).await;

    let payload = completed_event(&session_id);

    // Event arrives before the local purchase row exists: 200, nothing written.
    let resp = test::call_service(
        &app,
        signed_request(&payload, support::TEST_WEBHOOK_SECRET).to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    assert_eq!(support::purchase_count(pool, &session_id).await, 0);

    // The checkout initiator commits the row, then the gateway retries.
    let resource_id =
        support::insert_resource(pool, "Vision Workbook", "wb.pdf", false, Some("4.99")).await;
    let purchase_id =
        support::insert_purchase(pool, resource_id, "buyer-2", &session_id, false).await;

    let resp = test::call_service(
        &app,
        signed_request(&payload, support::TEST_WEBHOOK_SECRET).to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    assert!(support::purchase_is_paid(pool, purchase_id).await);
}

#[actix_web::test]
async fn unrelated_event_type_is_acknowledged_without_side_effects() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let session_id = format!("cs_test_{}", Uuid::new_v4());

    let resource_id =
        support::insert_resource(pool, "Journal Pack", "jp.pdf", false, Some("7.50")).await;
    let purchase_id =
        support::insert_purchase(pool, resource_id, "buyer-3", &session_id, false).await;

    let state = web::Data::new(support::build_state(pool.clone(), support::TEST_WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state).service(stripe_webhook)).await;

    let payload = serde_json::to_vec(&json!({
        "type": "charge.refunded",
        "data": { "object": { "id": session_id } }
    }))
    .expect("serialize event");

    let resp = test::call_service(
        &app,
        signed_request(&payload, support::TEST_WEBHOOK_SECRET).to_request(),
    )
    .await;

    assert!(resp.status().is_success());
    assert!(!support::purchase_is_paid(pool, purchase_id).await);
}

#[actix_web::test]
async fn completion_event_without_session_id_is_rejected() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let state = web::Data::new(support::build_state(pool.clone(), support::TEST_WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state).service(stripe_webhook)).await;

    let payload = serde_json::to_vec(&json!({
        "type": "checkout.session.completed",
        "data": { "object": { "payment_status": "paid" } }
    }))
    .expect("serialize event");

    let resp = test::call_service(
        &app,
        signed_request(&payload, support::TEST_WEBHOOK_SECRET).to_request(),
    )
    .await;

    assert_eq!(resp.status(), 400);
}
