//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the storage backend and registered in `server.rs` with the concrete type
//! (`web::get().to(cart::<SqliteDatabase>)`), since actix cannot infer generic handlers on its own.
//! Payment handlers live in [`crate::payment_routes`].
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use dukkan_engine::{
    db_types::{DirectOrderItem, DirectOrderRequest},
    events::{EventBus, Subscription},
    traits::NotificationQuery,
    LedgerStore,
    NotificationStore,
    Notifier,
    OrderLedgerApi,
    ProductCatalog,
    PushTokenStore,
};
use futures::StreamExt;
use log::*;
use serde_json::json;

use crate::{
    auth::{require_admin, AdminClaims, AuthState},
    data_objects::{AddItemRequest, DirectOrderBody, FcmTokenBody, JsonResponse, NotificationQueryParams, TokenRequest},
    errors::ServerError,
};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart   ----------------------------------------------------
/// Route handler for `GET /cart/{user_id}`. Creates the cart on first sight of the user.
pub async fn cart<B>(path: web::Path<String>, api: web::Data<OrderLedgerApi<B>>) -> Result<HttpResponse, ServerError>
where B: LedgerStore + ProductCatalog + Send + Sync + 'static {
    let user_id = path.into_inner();
    trace!("💻️ GET cart for {user_id}");
    let order = api.cart(&user_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn cart_add<B>(
    path: web::Path<String>,
    body: web::Json<AddItemRequest>,
    api: web::Data<OrderLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore + ProductCatalog + Send + Sync + 'static,
{
    let user_id = path.into_inner();
    let order = api.add_item(&user_id, body.product_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn cart_remove<B>(
    path: web::Path<String>,
    body: web::Json<AddItemRequest>,
    api: web::Data<OrderLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore + ProductCatalog + Send + Sync + 'static,
{
    let user_id = path.into_inner();
    let order = api.remove_item(&user_id, body.product_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn cart_checkout<B>(
    path: web::Path<String>,
    api: web::Data<OrderLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore + ProductCatalog + Send + Sync + 'static,
{
    let user_id = path.into_inner();
    let order = api.checkout(&user_id).await?;
    info!("💻️ {user_id} checked out order #{}", order.id);
    Ok(HttpResponse::Ok().json(json!({ "orderId": order.id, "total": order.total, "status": order.status })))
}

//----------------------------------------------   Orders   ----------------------------------------------------
pub async fn create_order<B>(
    body: web::Json<DirectOrderBody>,
    api: web::Data<OrderLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore + ProductCatalog + Send + Sync + 'static,
{
    let body = body.into_inner();
    if body.total.is_some() {
        debug!("💻️ Ignoring the client-supplied total on a direct order");
    }
    let request = DirectOrderRequest {
        user_id: body.user_id,
        items: body
            .items
            .into_iter()
            .map(|i| DirectOrderItem { product_id: i.product_id, quantity: i.quantity })
            .collect(),
        status: body.status,
    };
    let order = api.create_direct(request).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn orders_for_user<B>(
    path: web::Path<String>,
    api: web::Data<OrderLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore + ProductCatalog + Send + Sync + 'static,
{
    let user_id = path.into_inner();
    let orders = api.orders_for_user(&user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Notifications   ----------------------------------------------------
pub async fn notifications<B>(
    req: HttpRequest,
    params: web::Query<NotificationQueryParams>,
    notifier: web::Data<Notifier<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: NotificationStore + PushTokenStore + Clone + Send + Sync + 'static,
{
    let params = params.into_inner();
    if params.admin == Some(1) {
        require_admin(&req)?;
    }
    let query = NotificationQuery {
        page: params.page.unwrap_or(0),
        limit: params.limit.unwrap_or(0),
        unread_only: params.unread == Some(1),
        kind: params.kind,
        since: params.since,
        user_id: params.user_id,
    };
    let page = notifier.search(query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn notification_read<B>(
    _claims: AdminClaims,
    path: web::Path<i64>,
    notifier: web::Data<Notifier<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: NotificationStore + PushTokenStore + Clone + Send + Sync + 'static,
{
    let id = path.into_inner();
    if notifier.mark_read(id).await? {
        Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Notification {id} marked as read"))))
    } else {
        Err(ServerError::NoRecordFound(format!("Notification {id} does not exist")))
    }
}

pub async fn notifications_mark_all_read<B>(
    _claims: AdminClaims,
    notifier: web::Data<Notifier<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: NotificationStore + PushTokenStore + Clone + Send + Sync + 'static,
{
    let count = notifier.mark_all_read().await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{count} notification(s) marked as read"))))
}

//----------------------------------------------   Live events   ----------------------------------------------------
/// Route handler for `GET /events`. Holds the connection open and streams every bus event in SSE framing. The bus
/// subscription unregisters itself when the client disconnects and the stream is dropped.
pub async fn events(bus: web::Data<EventBus>) -> impl Responder {
    let subscription = bus.subscribe();
    debug!("📡️ SSE client #{} connected", subscription.id());
    let prelude =
        futures::stream::once(async { Ok::<_, actix_web::Error>(web::Bytes::from_static(b"retry: 10000\n\n")) });
    let body = futures::stream::unfold(subscription, |mut subscription: Subscription| async move {
        let event = subscription.recv().await?;
        Some((Ok::<_, actix_web::Error>(web::Bytes::from(format!("data: {event}\n\n"))), subscription))
    });
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(prelude.chain(body))
}

//----------------------------------------------   Push tokens   ----------------------------------------------------
const ANONYMOUS_SUBSCRIBER: &str = "anonymous";

pub async fn fcm_register<B>(
    body: web::Json<FcmTokenBody>,
    notifier: web::Data<Notifier<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: NotificationStore + PushTokenStore + Clone + Send + Sync + 'static,
{
    let body = body.into_inner();
    let subscriber = body.user_id.as_deref().unwrap_or(ANONYMOUS_SUBSCRIBER);
    notifier.register_token(subscriber, &body.token).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Token registered")))
}

pub async fn fcm_unregister<B>(
    body: web::Json<FcmTokenBody>,
    notifier: web::Data<Notifier<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: NotificationStore + PushTokenStore + Clone + Send + Sync + 'static,
{
    let body = body.into_inner();
    let subscriber = body.user_id.as_deref().unwrap_or(ANONYMOUS_SUBSCRIBER);
    notifier.unregister_token(subscriber, &body.token).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Token unregistered")))
}

//----------------------------------------------   Auth   ----------------------------------------------------
/// Route handler for `POST /auth/token`. Issues a signed bearer token; the admin claim is granted only when the
/// request presents the configured api key.
pub async fn auth_token(
    body: web::Json<TokenRequest>,
    state: web::Data<AuthState>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    let admin = match (&body.api_key, &state.api_key) {
        (Some(supplied), Some(expected)) => supplied == expected.reveal(),
        _ => false,
    };
    let token = state.issuer.issue(&body.user_id, admin)?;
    debug!("💻️ Issued {} token for {}", if admin { "an admin" } else { "a user" }, body.user_id);
    Ok(HttpResponse::Ok().json(json!({ "token": token, "admin": admin })))
}
