//! Payment-processor webhook intake.
//!
//! Two rules govern these endpoints. A request whose signature does not verify is rejected with
//! 401 and never parsed further. A request that verifies but cannot be processed still returns
//! 200 with a failure body, because the processor retries non-2xx deliveries forever and a
//! poison event would wedge the queue.
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use escrow_engine::{
    traits::{EscrowDatabase, PaymentProcessor},
    AccountSyncApi,
    AccountSyncError,
    FlowError,
    TransactionFlowApi,
};
use log::*;
use stripe_tools::{verify_webhook_signature, StripeEvent, DEFAULT_SIGNATURE_TOLERANCE_SECS};

use crate::{config::ServerConfig, data_objects::JsonResponse};

const SIGNATURE_HEADER: &str = "Stripe-Signature";

fn verify(req: &HttpRequest, body: &web::Bytes, config: &ServerConfig) -> Result<(), HttpResponse> {
    let header = match req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(h) => h,
        None => {
            warn!("🪝️ Webhook request without a signature header. Denying.");
            return Err(HttpResponse::Unauthorized().json(JsonResponse::failure("Missing signature header")));
        },
    };
    let secret = config.stripe.webhook_secret.reveal();
    if let Err(e) =
        verify_webhook_signature(body, header, secret, Utc::now().timestamp(), DEFAULT_SIGNATURE_TOLERANCE_SECS)
    {
        warn!("🪝️ Webhook signature verification failed: {e}. Denying.");
        return Err(HttpResponse::Unauthorized().json(JsonResponse::failure("Invalid signature")));
    }
    Ok(())
}

fn parse_event(body: &web::Bytes) -> Result<StripeEvent, HttpResponse> {
    serde_json::from_slice::<StripeEvent>(body).map_err(|e| {
        warn!("🪝️ Could not parse webhook event: {e}");
        // Signed but unparseable: acknowledge so the processor does not retry it forever.
        HttpResponse::Ok().json(JsonResponse::failure(format!("Could not parse event: {e}")))
    })
}

/// Handles `payment_intent.*` events.
pub async fn payment_webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<TransactionFlowApi<B>>,
    config: web::Data<ServerConfig>,
) -> HttpResponse
where B: EscrowDatabase + 'static
{
    trace!("🪝️ Received payment webhook: {}", req.uri());
    if let Err(resp) = verify(&req, &body, &config) {
        return resp;
    }
    let event = match parse_event(&body) {
        Ok(ev) => ev,
        Err(resp) => return resp,
    };
    let intent_id = event.data.object["id"].as_str().unwrap_or_default().to_string();
    let status = event.data.object["status"].as_str().unwrap_or_default().to_string();
    debug!("🪝️ Payment event [{}] {} for [{intent_id}]", event.id, event.event_type);
    let result = match event.event_type.as_str() {
        "payment_intent.succeeded" => match api.payment_succeeded(&intent_id, &status).await {
            Ok(Some(tx)) => {
                info!("🪝️ Payment confirmed for transaction #{}", tx.id);
                JsonResponse::success(format!("Transaction {} is in escrow", tx.id))
            },
            Ok(None) => JsonResponse::success("Already processed"),
            Err(e @ FlowError::PaymentIntentNotFound(_)) => {
                warn!("🪝️ {e}");
                JsonResponse::failure(e)
            },
            Err(e) => {
                error!("🪝️ Could not process payment confirmation: {e}");
                JsonResponse::failure(e)
            },
        },
        "payment_intent.payment_failed" => match api.payment_failed(&intent_id, &status).await {
            Ok(()) => JsonResponse::success("Failure recorded"),
            Err(e) => {
                warn!("🪝️ Could not record payment failure: {e}");
                JsonResponse::failure(e)
            },
        },
        other => {
            trace!("🪝️ Ignoring payment event type {other}");
            JsonResponse::success(format!("Ignored event type {other}"))
        },
    };
    HttpResponse::Ok().json(result)
}

/// Handles `account.*` events.
pub async fn account_webhook<B, P>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<AccountSyncApi<B, P>>,
    config: web::Data<ServerConfig>,
) -> HttpResponse
where
    B: EscrowDatabase + 'static,
    P: PaymentProcessor + 'static,
{
    trace!("🪝️ Received account webhook: {}", req.uri());
    if let Err(resp) = verify(&req, &body, &config) {
        return resp;
    }
    let event = match parse_event(&body) {
        Ok(ev) => ev,
        Err(resp) => return resp,
    };
    // Connected-account events carry the account id at the envelope level; fall back to the
    // object id for platform-level test events.
    let account_id = event
        .account
        .clone()
        .or_else(|| event.data.object["id"].as_str().map(String::from))
        .unwrap_or_default();
    debug!("🪝️ Account event [{}] {} for [{account_id}]", event.id, event.event_type);
    let result = match event.event_type.as_str() {
        "account.updated" => match api.sync_account(&account_id).await {
            Ok(profile) => JsonResponse::success(format!("Account synced for user {}", profile.user_id)),
            Err(e @ AccountSyncError::UnknownAccount(_)) => {
                info!("🪝️ {e}");
                JsonResponse::failure(e)
            },
            Err(e) => {
                error!("🪝️ Could not sync account [{account_id}]: {e}");
                JsonResponse::failure(e)
            },
        },
        "account.application.deauthorized" => match api.disconnect_account(&account_id).await {
            Ok(profile) => JsonResponse::success(format!("Account disconnected for user {}", profile.user_id)),
            Err(e) => {
                warn!("🪝️ Could not disconnect account [{account_id}]: {e}");
                JsonResponse::failure(e)
            },
        },
        other => {
            trace!("🪝️ Ignoring account event type {other}");
            JsonResponse::success(format!("Ignored event type {other}"))
        },
    };
    HttpResponse::Ok().json(result)
}
