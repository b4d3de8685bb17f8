use actix_http::Request;
use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::Duration;
use dukkan_common::{Money, Secret};
use dukkan_engine::{
    events::EventBus,
    test_utils::{prepare_test_env, random_db_path, seed_product},
    Notifier,
    OrderLedgerApi,
    PaymentIntakeApi,
    SqliteDatabase,
};

use crate::{
    auth::AuthState,
    config::{AuthConfig, WebhookConfig},
    helpers::calculate_hmac,
    integrations::kuraimi::KuraimiClient,
    proof_store::FsProofStore,
    server::register_routes,
};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const WEBHOOK_HEADER: &str = "x-kuraimi-signature";

/// A scratch database with product 7 (price 1000) seeded.
pub async fn test_db() -> SqliteDatabase {
    let db = prepare_test_env(&random_db_path()).await;
    seed_product(&db, 7, "Mocha beans 1kg", Money::from(1000)).await.unwrap();
    db
}

/// App configuration over the given database: real routes, api-key auth, webhook signature checks enabled.
pub fn configure_with(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let bus = EventBus::new();
        let notifier = Notifier::new(db.clone(), bus.clone(), vec![]);
        let auth_config = AuthConfig {
            api_key: Some(Secret::new(TEST_API_KEY.to_string())),
            token_secret: Secret::new("endpoint-test-secret".to_string()),
            token_lifetime: Duration::hours(1),
        };
        let webhook =
            WebhookConfig { secret: Some(Secret::new(TEST_WEBHOOK_SECRET.to_string())), header: WEBHOOK_HEADER.into() };
        let proof_dir = std::env::temp_dir().join(format!("dukkan_proofs_{}", rand::random::<u64>()));
        cfg.app_data(web::Data::new(OrderLedgerApi::new(db.clone())))
            .app_data(web::Data::new(PaymentIntakeApi::new(db.clone(), notifier.clone())))
            .app_data(web::Data::new(notifier))
            .app_data(web::Data::new(bus))
            .app_data(web::Data::new(AuthState::new(&auth_config)))
            .app_data(web::Data::new(FsProofStore::new(proof_dir)))
            .app_data(web::Data::new(None::<KuraimiClient>));
        register_routes::<SqliteDatabase>(cfg, &webhook);
    }
}

/// Runs one request against a fresh service instance. Middleware rejections surface as their error responses, the
/// same way a live client sees them.
pub async fn request(req: Request, db: SqliteDatabase) -> (StatusCode, String) {
    let service = test::init_service(App::new().configure(configure_with(db))).await;
    match test::try_call_service(&service, req).await {
        Ok(res) => {
            let status = res.status();
            let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
            (status, body)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = actix_web::body::to_bytes(res.into_body()).await.unwrap_or_else(|_| web::Bytes::new());
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub async fn get(path: &str, db: SqliteDatabase) -> (StatusCode, String) {
    request(TestRequest::get().uri(path).to_request(), db).await
}

pub async fn post(path: &str, body: serde_json::Value, db: SqliteDatabase) -> (StatusCode, String) {
    request(TestRequest::post().uri(path).set_json(body).to_request(), db).await
}

pub async fn post_as_admin(path: &str, body: serde_json::Value, db: SqliteDatabase) -> (StatusCode, String) {
    let req = TestRequest::post().uri(path).insert_header(("x-api-key", TEST_API_KEY)).set_json(body).to_request();
    request(req, db).await
}

/// Posts a webhook body with a signature computed under `secret`, exactly as the provider would.
pub async fn post_signed(
    path: &str,
    body: &serde_json::Value,
    secret: &str,
    db: SqliteDatabase,
) -> (StatusCode, String) {
    let payload = body.to_string();
    let signature = calculate_hmac(secret, payload.as_bytes());
    let req = TestRequest::post()
        .uri(path)
        .insert_header(("content-type", "application/json"))
        .insert_header((WEBHOOK_HEADER, signature))
        .set_payload(payload)
        .to_request();
    request(req, db).await
}
