use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Duration;
use escrow_engine::{events::EventProducers, DisputeApi};
use serde_json::json;

use super::{
    helpers::{get_request, issue_token, issue_token_with_validity, post_request},
    mocks::{MockEscrowDb, MockProcessor},
};
use crate::{auth::Role, routes::resolve_dispute};

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/transactions/1", configure_fetch).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token was provided"), "was: {body}");
}

#[actix_web::test]
async fn garbage_tokens_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("made up nonsense", "/transactions/1", configure_fetch).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "was: {body}");
}

#[actix_web::test]
async fn expired_tokens_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let token = issue_token_with_validity("buyer-alice", vec![Role::User], Duration::hours(-2));
    let (status, body) = get_request(&token, "/transactions/1", configure_fetch).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "was: {body}");
}

#[actix_web::test]
async fn tampered_tokens_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let mut token = issue_token("buyer-alice", vec![Role::Admin]);
    let n = token.len();
    token.replace_range(n - 6..n - 1, "AAAAA");
    let (status, body) = get_request(&token, "/transactions/1", configure_fetch).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "was: {body}");
}

#[actix_web::test]
async fn dispute_resolution_requires_the_admin_role() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("buyer-alice", vec![Role::User]);
    let payload = json!({ "resolution": "seller", "reason": "item as described" });
    let (status, body) = post_request(&token, "/disputes/1/resolve", payload, configure_resolve).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("requires the admin role"), "was: {body}");
}

fn configure_fetch(cfg: &mut ServiceConfig) {
    // Auth is rejected before the handler runs, so the backend expects no calls.
    let db = MockEscrowDb::new();
    cfg.app_data(web::Data::new(db))
        .route("/transactions/{id}", web::get().to(crate::routes::get_transaction::<MockEscrowDb>));
}

fn configure_resolve(cfg: &mut ServiceConfig) {
    let api = DisputeApi::new(MockEscrowDb::new(), MockProcessor::new(), EventProducers::default());
    cfg.app_data(web::Data::new(api))
        .route("/disputes/{id}/resolve", web::post().to(resolve_dispute::<MockEscrowDb, MockProcessor>));
}
