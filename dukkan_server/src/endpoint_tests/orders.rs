use actix_web::http::StatusCode;
use dukkan_engine::db_types::Order;
use serde_json::json;

use super::helpers::{get, post, test_db};

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let (status, body) = get("/health", db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn cart_flow_over_http() {
    let _ = env_logger::try_init();
    let db = test_db().await;

    let (status, body) = get("/cart/alice", db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let cart: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(cart.total.value(), 0);

    let (status, body) =
        post("/cart/alice/add", json!({"productId": 7, "quantity": 2}), db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let cart: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(cart.total.value(), 2000);

    let (status, body) =
        post("/cart/alice/remove", json!({"productId": 7, "quantity": 1}), db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let cart: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(cart.total.value(), 1000);

    let (status, body) = post("/cart/alice/checkout", json!({}), db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["total"], 1000);
    assert_eq!(response["status"], "pending_payment");

    let (status, body) = get("/orders/alice", db).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 1);
}

#[actix_web::test]
async fn adding_an_unknown_product_is_a_404() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let (status, body) = post("/cart/bob/add", json!({"productId": 999, "quantity": 1}), db).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("999"));
}

#[actix_web::test]
async fn bad_quantities_are_a_400() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let (status, _) = post("/cart/bob/add", json!({"productId": 7, "quantity": 0}), db).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn empty_cart_checkout_is_a_400() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let (status, _) = get("/cart/carol", db.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post("/cart/carol/checkout", json!({}), db).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn direct_orders_ignore_the_client_total() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let body = json!({
        "userId": "dave",
        "items": [{"productId": 7, "quantity": 3}],
        "total": 1,
    });
    let (status, body) = post("/orders/create", body, db).await;
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.total.value(), 3000);
}

#[actix_web::test]
async fn direct_orders_require_items() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let (status, _) = post("/orders/create", json!({"items": []}), db).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
