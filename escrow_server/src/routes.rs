//! Authenticated API routes.
//!
//! Handlers are generic over the backend traits so the endpoint tests can run them against
//! mocks; `server.rs` registers them with the concrete production types.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use escrow_engine::{
    db_types::Transaction,
    fees::FeeBreakdown,
    traits::{EscrowDatabase, PaymentProcessor},
    CheckoutApi,
    CheckoutReceipt,
    CheckoutRequest,
    DisputeApi,
    TransactionFlowApi,
};
use serde::Deserialize;

use crate::{
    auth::JwtClaims,
    data_objects::{CheckoutPayload, DisputePayload, ResolutionPayload, ShipmentPayload},
    errors::ServerError,
};

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Route handler for the checkout endpoint. The buyer is whoever the token says it is.
pub async fn checkout<B, P>(
    claims: JwtClaims,
    body: web::Json<CheckoutPayload>,
    api: web::Data<CheckoutApi<B, P>>,
) -> Result<web::Json<CheckoutReceipt>, ServerError>
where
    B: EscrowDatabase + 'static,
    P: PaymentProcessor + 'static,
{
    let payload = body.into_inner();
    debug!("💻️ Checkout request from [{}] for listing [{}]", claims.sub, payload.listing_id);
    let req = CheckoutRequest {
        buyer_id: claims.sub,
        listing_id: payload.listing_id,
        expected_price: payload.expected_price,
        ship_to: payload.ship_to,
    };
    let receipt = api.checkout(req).await?;
    Ok(web::Json(receipt))
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub postal_code: String,
}

/// Route handler for price quotes. Read-only; any authenticated user may ask.
pub async fn quote<B, P>(
    _claims: JwtClaims,
    path: web::Path<String>,
    params: web::Query<QuoteParams>,
    api: web::Data<CheckoutApi<B, P>>,
) -> Result<web::Json<FeeBreakdown>, ServerError>
where
    B: EscrowDatabase + 'static,
    P: PaymentProcessor + 'static,
{
    let listing_id = path.into_inner();
    let breakdown = api.quote(&listing_id, &params.postal_code).await?;
    Ok(web::Json(breakdown))
}

/// Route handler for fetching a transaction. Only the parties and admins may see it.
pub async fn get_transaction<B>(
    claims: JwtClaims,
    path: web::Path<i64>,
    db: web::Data<B>,
) -> Result<web::Json<Transaction>, ServerError>
where B: EscrowDatabase + 'static
{
    let id = path.into_inner();
    let tx = db
        .fetch_transaction(id)
        .await
        .map_err(|e| ServerError::BackendError(e.to_string()))?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Transaction {id} does not exist")))?;
    if !tx.is_party(&claims.sub) && !claims.is_admin() {
        return Err(ServerError::InsufficientPermissions("You are not a party to this transaction.".to_string()));
    }
    Ok(web::Json(tx))
}

/// Route handler for recording a shipment. The engine enforces that the caller is the seller.
pub async fn ship<B>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ShipmentPayload>,
    api: web::Data<TransactionFlowApi<B>>,
) -> Result<web::Json<Transaction>, ServerError>
where B: EscrowDatabase + 'static
{
    let id = path.into_inner();
    let payload = body.into_inner();
    debug!("💻️ Shipment request from [{}] for transaction #{id}", claims.sub);
    let tx = api.record_shipment(id, &claims.sub, &payload.tracking_number, payload.carrier).await?;
    Ok(web::Json(tx))
}

/// Route handler for opening a dispute. The engine enforces that the caller is a party.
pub async fn open_dispute<B>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<DisputePayload>,
    api: web::Data<TransactionFlowApi<B>>,
) -> Result<web::Json<Transaction>, ServerError>
where B: EscrowDatabase + 'static
{
    let id = path.into_inner();
    let payload = body.into_inner();
    let tx = api.open_dispute(id, &claims.sub, &payload.reason).await?;
    Ok(web::Json(tx))
}

/// Route handler for resolving a dispute. Admin only.
pub async fn resolve_dispute<B, P>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ResolutionPayload>,
    api: web::Data<DisputeApi<B, P>>,
) -> Result<web::Json<Transaction>, ServerError>
where
    B: EscrowDatabase + 'static,
    P: PaymentProcessor + 'static,
{
    claims.require_admin()?;
    let id = path.into_inner();
    let payload = body.into_inner();
    info!("💻️ Dispute resolution for transaction #{id} by [{}]: {}", claims.sub, payload.resolution);
    let tx = api.resolve(id, payload.resolution, payload.split_amount, &payload.reason).await?;
    Ok(web::Json(tx))
}
