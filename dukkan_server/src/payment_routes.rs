//! Payment flow handlers: proof upload, staff confirmation, provider session creation, and the webhook.
//!
//! The webhook route MUST be registered behind [`crate::middleware::HmacMiddlewareFactory`]; nothing here re-checks
//! the signature.
use actix_web::{web, HttpResponse};
use dukkan_engine::{LedgerStore, NotificationStore, PaymentIntakeApi, PushTokenStore};
use log::*;
use serde_json::json;

use crate::{
    auth::AdminClaims,
    data_objects::{ConfirmPaymentBody, KuraimiCreateBody, UploadProofBody, WebhookBody},
    errors::ServerError,
    integrations::kuraimi::KuraimiClient,
    proof_store::FsProofStore,
};

/// Route handler for `POST /orders/{id}/upload-proof`.
///
/// Inline evidence is decoded and written to the proof store first; a storage failure is logged and the payment is
/// still recorded without a proof locator.
pub async fn upload_proof<B>(
    path: web::Path<i64>,
    body: web::Json<UploadProofBody>,
    intake: web::Data<PaymentIntakeApi<B>>,
    proofs: web::Data<FsProofStore>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore + NotificationStore + PushTokenStore + Send + Sync + 'static,
{
    let order_id = path.into_inner();
    let body = body.into_inner();
    // Resolve the order up front so evidence is never written for a nonexistent order.
    intake.order(order_id).await?;

    let proof_url = match (body.proof_base64, body.proof_url) {
        (Some(encoded), _) => {
            let bytes = base64::decode(encoded.as_bytes())
                .map_err(|e| ServerError::InvalidRequestBody(format!("proofBase64 is not valid base64: {e}")))?;
            match proofs.store(order_id, &bytes).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("📝️ Could not store payment evidence for order #{order_id}: {e}");
                    None
                },
            }
        },
        (None, url) => url,
    };
    let (payment, order) =
        intake.submit_proof(order_id, body.method, body.amount, proof_url, body.provider_reference).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": order.status, "payment": payment })))
}

/// Route handler for `POST /admin/orders/{id}/confirm-payment`. Staff credential required.
pub async fn confirm_payment<B>(
    _claims: AdminClaims,
    path: web::Path<i64>,
    body: web::Json<ConfirmPaymentBody>,
    intake: web::Data<PaymentIntakeApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore + NotificationStore + PushTokenStore + Send + Sync + 'static,
{
    let order_id = path.into_inner();
    let body = body.into_inner();
    let (payment, order) =
        intake.confirm(order_id, body.payment_id, body.provider_reference.as_deref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": order.status, "paymentId": payment.id })))
}

/// Route handler for `POST /payments/kuraimi/create`.
///
/// With provider credentials configured this creates a hosted payment session; without them it returns manual
/// transfer instructions carrying the same `ORDER-<id>` reference, so the webhook can still settle the order later.
pub async fn kuraimi_create<B>(
    body: web::Json<KuraimiCreateBody>,
    intake: web::Data<PaymentIntakeApi<B>>,
    client: web::Data<Option<KuraimiClient>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore + NotificationStore + PushTokenStore + Send + Sync + 'static,
{
    let body = body.into_inner();
    let order = intake.order(body.order_id).await?;
    let reference = format!("ORDER-{}", order.id);
    match client.as_ref() {
        Some(client) => {
            let session = client
                .create_payment(&reference, order.total, body.service_code.as_deref(), body.wallet_code.as_deref())
                .await
                .map_err(|e| ServerError::BackendError(e.to_string()))?;
            info!("💳️ Kuraimi session {} created for order #{}", session.session_id, order.id);
            Ok(HttpResponse::Ok().json(json!({ "reference": reference, "session": session })))
        },
        None => Ok(HttpResponse::Ok().json(json!({
            "reference": reference,
            "amount": order.total,
            "currency": dukkan_common::STORE_CURRENCY_CODE,
            "instructions": format!(
                "Transfer {} via Kuraimi and quote the reference {reference} in the transfer note",
                order.total
            ),
        }))),
    }
}

/// Route handler for `POST /webhooks/kuraimi`. The HMAC middleware has already verified the body signature.
pub async fn kuraimi_webhook<B>(
    body: web::Json<WebhookBody>,
    intake: web::Data<PaymentIntakeApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore + NotificationStore + PushTokenStore + Send + Sync + 'static,
{
    let body = body.into_inner();
    trace!("💳️ Webhook received for {}", body.reference);
    let upsert =
        intake.ingest_webhook(&body.reference, &body.status, body.provider_reference, body.amount).await?;
    Ok(HttpResponse::Ok().json(json!({ "received": true, "inserted": upsert.inserted })))
}
