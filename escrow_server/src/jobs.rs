//! Scheduler-facing job triggers.
//!
//! External schedulers (cron, Cloud Scheduler) hit these endpoints to drive the delivery
//! reconciliation and escrow release jobs. They accept GET as well as POST because several
//! schedulers can only issue GETs. A bearer token, shared with the scheduler via
//! `MEG_JOB_TOKEN`, guards them.
use actix_web::{web, HttpRequest, HttpResponse};
use escrow_engine::{
    traits::{CarrierTracking, EscrowDatabase},
    TransactionFlowApi,
};
use log::*;

use crate::{config::ServerConfig, data_objects::JsonResponse};

fn check_job_token(req: &HttpRequest, config: &ServerConfig) -> Result<(), HttpResponse> {
    let presented = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == config.job_token.reveal() => Ok(()),
        Some(_) => {
            warn!("🗓️ Job trigger with a wrong bearer token. Denying.");
            Err(HttpResponse::Unauthorized().json(JsonResponse::failure("Invalid job token")))
        },
        None => {
            warn!("🗓️ Job trigger without a bearer token. Denying.");
            Err(HttpResponse::Unauthorized().json(JsonResponse::failure("Missing job token")))
        },
    }
}

pub async fn trigger_delivery_checks<B, T>(
    req: HttpRequest,
    api: web::Data<TransactionFlowApi<B>>,
    tracker: web::Data<T>,
    config: web::Data<ServerConfig>,
) -> HttpResponse
where
    B: EscrowDatabase + 'static,
    T: CarrierTracking + 'static,
{
    if let Err(resp) = check_job_token(&req, &config) {
        return resp;
    }
    match api.run_delivery_checks(tracker.get_ref()).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            error!("🗓️ Delivery reconciliation run failed: {e}");
            HttpResponse::InternalServerError().json(JsonResponse::failure(e))
        },
    }
}

pub async fn trigger_escrow_release<B>(
    req: HttpRequest,
    api: web::Data<TransactionFlowApi<B>>,
    config: web::Data<ServerConfig>,
) -> HttpResponse
where B: EscrowDatabase + 'static
{
    if let Err(resp) = check_job_token(&req, &config) {
        return resp;
    }
    match api.run_escrow_release().await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            error!("🗓️ Escrow release run failed: {e}");
            HttpResponse::InternalServerError().json(JsonResponse::failure(e))
        },
    }
}
