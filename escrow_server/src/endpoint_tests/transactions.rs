use actix_web::{http::StatusCode, web, web::ServiceConfig};

use super::{
    helpers::{get_request, issue_token},
    mocks::{sample_transaction, MockEscrowDb},
};
use crate::{auth::Role, routes::get_transaction};

#[actix_web::test]
async fn the_buyer_can_fetch_their_transaction() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("buyer-alice", vec![Role::User]);
    let (status, body) = get_request(&token, "/transactions/1", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""payment_intent_id":"pi_mock_0001""#), "was: {body}");
}

#[actix_web::test]
async fn the_seller_can_fetch_their_transaction() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("seller-bob", vec![Role::User]);
    let (status, body) = get_request(&token, "/transactions/1", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""buyer_id":"buyer-alice""#), "was: {body}");
}

#[actix_web::test]
async fn strangers_cannot_fetch_someone_elses_transaction() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("nosy-nellie", vec![Role::User]);
    let (status, body) = get_request(&token, "/transactions/1", configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("not a party"), "was: {body}");
}

#[actix_web::test]
async fn admins_can_fetch_any_transaction() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("support-desk", vec![Role::Admin]);
    let (status, _) = get_request(&token, "/transactions/1", configure).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn missing_transactions_are_not_found() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("buyer-alice", vec![Role::User]);
    let (status, body) = get_request(&token, "/transactions/999", configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("does not exist"), "was: {body}");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_fetch_transaction()
        .returning(|id| if id == 1 { Ok(Some(sample_transaction())) } else { Ok(None) });
    cfg.app_data(web::Data::new(db)).route("/transactions/{id}", web::get().to(get_transaction::<MockEscrowDb>));
}
