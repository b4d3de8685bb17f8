use std::time::Duration;

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use dukkan_engine::{
    events::EventBus,
    LedgerStore,
    NotificationStore,
    Notifier,
    OrderLedgerApi,
    PaymentIntakeApi,
    ProductCatalog,
    PushTokenStore,
    SqliteDatabase,
};
use log::*;

use crate::{
    auth::AuthState,
    config::{ServerConfig, WebhookConfig},
    errors::ServerError,
    integrations::{channels_from_config, kuraimi::KuraimiClient},
    middleware::HmacMiddlewareFactory,
    payment_routes,
    proof_store::FsProofStore,
    routes,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
) -> Result<actix_web::dev::Server, ServerError> {
    // One bus and one notifier for the whole server. Worker factories clone them, so every worker publishes into the
    // same subscriber registry.
    let bus = EventBus::new();
    let notifier = Notifier::new(db.clone(), bus.clone(), channels_from_config(&config.channels));
    let kuraimi = KuraimiClient::from_config(&config.kuraimi)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("💻️ Server instance created for {}:{}", config.host, config.port);
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let ledger = OrderLedgerApi::new(db.clone());
        let intake = PaymentIntakeApi::new(db.clone(), notifier.clone());
        let auth_state = AuthState::new(&config.auth);
        let proofs = FsProofStore::new(config.proof_dir.as_str());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("dkn::access_log"))
            .app_data(web::Data::new(ledger))
            .app_data(web::Data::new(intake))
            .app_data(web::Data::new(notifier.clone()))
            .app_data(web::Data::new(bus.clone()))
            .app_data(web::Data::new(auth_state))
            .app_data(web::Data::new(proofs))
            .app_data(web::Data::new(kuraimi.clone()))
            .configure(|cfg| register_routes::<SqliteDatabase>(cfg, &config.webhook))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Registers every route on the app. Shared between the server factory and the endpoint tests so both always exercise
/// the same routing table, including the HMAC guard on the webhook scope.
pub fn register_routes<B>(cfg: &mut web::ServiceConfig, webhook: &WebhookConfig)
where B: LedgerStore + ProductCatalog + NotificationStore + PushTokenStore + Send + Sync + 'static {
    let webhook_scope = web::scope("/webhooks")
        .wrap(HmacMiddlewareFactory::new(&webhook.header, webhook.secret.clone()))
        .route("/kuraimi", web::post().to(payment_routes::kuraimi_webhook::<B>));
    cfg.service(routes::health)
        .route("/cart/{user_id}", web::get().to(routes::cart::<B>))
        .route("/cart/{user_id}/add", web::post().to(routes::cart_add::<B>))
        .route("/cart/{user_id}/remove", web::post().to(routes::cart_remove::<B>))
        .route("/cart/{user_id}/checkout", web::post().to(routes::cart_checkout::<B>))
        .route("/orders/create", web::post().to(routes::create_order::<B>))
        .route("/orders/{user_id}", web::get().to(routes::orders_for_user::<B>))
        .route("/orders/{id}/upload-proof", web::post().to(payment_routes::upload_proof::<B>))
        .route("/admin/orders/{id}/confirm-payment", web::post().to(payment_routes::confirm_payment::<B>))
        .route("/payments/kuraimi/create", web::post().to(payment_routes::kuraimi_create::<B>))
        .route("/notifications", web::get().to(routes::notifications::<B>))
        .route("/notifications/mark-all-read", web::post().to(routes::notifications_mark_all_read::<B>))
        .route("/notifications/{id}/read", web::post().to(routes::notification_read::<B>))
        .route("/events", web::get().to(routes::events))
        .route("/fcm/register", web::post().to(routes::fcm_register::<B>))
        .route("/fcm/unregister", web::post().to(routes::fcm_unregister::<B>))
        .route("/auth/token", web::post().to(routes::auth_token))
        .service(webhook_scope);
}
