use actix_web::{http::StatusCode, test::TestRequest};
use dukkan_engine::{
    db_types::{Order, OrderStatus},
    LedgerStore,
    OrderLedgerApi,
    SqliteDatabase,
};
use serde_json::json;

use super::helpers::{get, post, post_as_admin, post_signed, request, test_db, TEST_API_KEY, TEST_WEBHOOK_SECRET};

/// A checked-out order for `user` with one unit of product 7, created straight through the engine.
async fn checked_out_order(db: &SqliteDatabase, user: &str) -> Order {
    let ledger = OrderLedgerApi::new(db.clone());
    ledger.add_item(user, 7, 1).await.unwrap();
    ledger.checkout(user).await.unwrap()
}

#[actix_web::test]
async fn proof_upload_records_a_pending_payment() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let order = checked_out_order(&db, "alice").await;

    let body = json!({
        "method": "bank_transfer",
        "proofBase64": base64::encode(b"fake slip"),
    });
    let (status, body) = post(&format!("/orders/{}/upload-proof", order.id), body, db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["status"], "pending_payment");
    assert_eq!(response["payment"]["status"], "pending");
    assert_eq!(response["payment"]["amount"], 1000);
    assert!(response["payment"]["proofUrl"].as_str().unwrap().starts_with("/uploads/"));
}

#[actix_web::test]
async fn proof_upload_for_an_unknown_order_is_a_404() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let (status, _) = post("/orders/999/upload-proof", json!({"method": "cash"}), db).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn confirm_without_a_credential_is_a_401_and_mutates_nothing() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let order = checked_out_order(&db, "bob").await;
    post(&format!("/orders/{}/upload-proof", order.id), json!({"method": "cash"}), db.clone()).await;

    let (status, _) = post(&format!("/admin/orders/{}/confirm-payment", order.id), json!({}), db.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::PendingPayment);
}

#[actix_web::test]
async fn confirm_with_the_api_key_settles_the_order() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let order = checked_out_order(&db, "carol").await;
    post(&format!("/orders/{}/upload-proof", order.id), json!({"method": "kuraimi"}), db.clone()).await;

    let (status, body) =
        post_as_admin(&format!("/admin/orders/{}/confirm-payment", order.id), json!({}), db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["status"], "paid");
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
}

#[actix_web::test]
async fn confirm_with_an_admin_bearer_token_works_too() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let order = checked_out_order(&db, "dave").await;
    post(&format!("/orders/{}/upload-proof", order.id), json!({"method": "card"}), db.clone()).await;

    let (status, body) =
        post("/auth/token", json!({"userId": "staff-1", "apiKey": TEST_API_KEY}), db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["admin"], true);
    let token = response["token"].as_str().unwrap().to_string();

    let req = TestRequest::post()
        .uri(&format!("/admin/orders/{}/confirm-payment", order.id))
        .insert_header(("authorization", format!("Bearer {token}")))
        .set_json(json!({}))
        .to_request();
    let (status, _) = request(req, db).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn tokens_without_the_api_key_are_not_admin() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let (status, body) = post("/auth/token", json!({"userId": "u-1"}), db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["admin"], false);
    let token = response["token"].as_str().unwrap().to_string();

    let req = TestRequest::post()
        .uri("/notifications/mark-all-read")
        .insert_header(("authorization", format!("Bearer {token}")))
        .set_json(json!({}))
        .to_request();
    let (status, _) = request(req, db).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn unsigned_webhooks_never_reach_the_handler() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let order = checked_out_order(&db, "erin").await;
    let body = json!({"reference": format!("ORDER-{}", order.id), "status": "paid"});

    // No signature header at all.
    let (status, _) = post("/webhooks/kuraimi", body.clone(), db.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Signed under the wrong key.
    let (status, _) = post_signed("/webhooks/kuraimi", &body, "wrong-secret", db.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::PendingPayment);
}

#[actix_web::test]
async fn signed_webhook_settles_the_order() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let order = checked_out_order(&db, "frank").await;
    let body = json!({
        "reference": format!("ORDER-{}", order.id),
        "status": "paid",
        "providerReference": "TXN-900",
    });
    let (status, response) = post_signed("/webhooks/kuraimi", &body, TEST_WEBHOOK_SECRET, db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["received"], true);
    assert_eq!(response["inserted"], true);

    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
}

#[actix_web::test]
async fn signed_webhook_with_a_malformed_reference_is_a_400() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let body = json!({"reference": "ORDER-abc", "status": "paid"});
    let (status, _) = post_signed("/webhooks/kuraimi", &body, TEST_WEBHOOK_SECRET, db).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn kuraimi_create_falls_back_to_manual_instructions() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let order = checked_out_order(&db, "grace").await;
    let (status, body) = post("/payments/kuraimi/create", json!({"orderId": order.id}), db).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["reference"], format!("ORDER-{}", order.id));
    assert_eq!(response["amount"], 1000);
    assert!(response["instructions"].as_str().unwrap().contains("Kuraimi"));
}

#[actix_web::test]
async fn admin_notification_queries_require_a_credential() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let order = checked_out_order(&db, "heidi").await;
    post(&format!("/orders/{}/upload-proof", order.id), json!({"method": "cash"}), db.clone()).await;

    let (status, _) = get("/notifications?admin=1", db.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get()
        .uri("/notifications?admin=1&kind=payment_proof_uploaded")
        .insert_header(("x-api-key", TEST_API_KEY))
        .to_request();
    let (status, body) = request(req, db).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["total"], 1);
}
