use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use escrow_engine::{events::EventProducers, AccountSyncApi, TransactionFlowApi};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{
    helpers::{send, test_server_config, TEST_WEBHOOK_SECRET},
    mocks::{MockEscrowDb, MockProcessor},
};
use crate::webhook_routes::{account_webhook, payment_webhook};

const PAYMENT_EVENT: &str = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_unknown","status":"succeeded"}}}"#;
const IGNORED_EVENT: &str = r#"{"id":"evt_2","type":"payment_intent.created","data":{"object":{"id":"pi_unknown","status":"requires_payment_method"}}}"#;
const DEAUTH_EVENT: &str = r#"{"id":"evt_3","type":"account.application.deauthorized","account":"acct_404","data":{"object":{"id":"ca_application"}}}"#;

fn sign(payload: &str, secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    let v1 = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={v1}")
}

fn signed_request(uri: &str, payload: &'static str, signature: String) -> TestRequest {
    TestRequest::post().uri(uri).insert_header(("Stripe-Signature", signature)).set_payload(payload)
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/webhook/payment").set_payload(PAYMENT_EVENT);
    let (status, body) = send(req, configure_payment).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Missing signature header"), "was: {body}");
}

#[actix_web::test]
async fn wrongly_signed_webhooks_are_rejected() {
    let _ = env_logger::try_init().ok();
    let sig = sign(PAYMENT_EVENT, "whsec_somebody_elses_secret", Utc::now().timestamp());
    let (status, body) = send(signed_request("/webhook/payment", PAYMENT_EVENT, sig), configure_payment).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid signature"), "was: {body}");
}

#[actix_web::test]
async fn stale_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let stale = (Utc::now() - Duration::minutes(10)).timestamp();
    let sig = sign(PAYMENT_EVENT, TEST_WEBHOOK_SECRET, stale);
    let (status, body) = send(signed_request("/webhook/payment", PAYMENT_EVENT, sig), configure_payment).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid signature"), "was: {body}");
}

// A signed event for a transaction we know nothing about must still be acknowledged with a 200,
// or the processor will retry it forever.
#[actix_web::test]
async fn unknown_payment_intents_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let sig = sign(PAYMENT_EVENT, TEST_WEBHOOK_SECRET, Utc::now().timestamp());
    let (status, body) = send(signed_request("/webhook/payment", PAYMENT_EVENT, sig), configure_payment).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":false"#), "was: {body}");
}

#[actix_web::test]
async fn irrelevant_event_types_are_acknowledged_and_ignored() {
    let _ = env_logger::try_init().ok();
    let sig = sign(IGNORED_EVENT, TEST_WEBHOOK_SECRET, Utc::now().timestamp());
    let (status, body) = send(signed_request("/webhook/payment", IGNORED_EVENT, sig), configure_payment).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Ignored event type"), "was: {body}");
}

#[actix_web::test]
async fn deauthorization_for_an_unknown_account_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let sig = sign(DEAUTH_EVENT, TEST_WEBHOOK_SECRET, Utc::now().timestamp());
    let (status, body) = send(signed_request("/webhook/account", DEAUTH_EVENT, sig), configure_account).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":false"#), "was: {body}");
}

fn configure_payment(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_fetch_transaction_by_payment_intent().returning(|_| Ok(None));
    let api = TransactionFlowApi::new(db, EventProducers::default(), Duration::hours(24), std::time::Duration::ZERO);
    cfg.app_data(web::Data::new(api))
        .app_data(web::Data::new(test_server_config()))
        .route("/webhook/payment", web::post().to(payment_webhook::<MockEscrowDb>));
}

fn configure_account(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_clear_connected_account().returning(|_| Ok(None));
    let api = AccountSyncApi::new(db, MockProcessor::new());
    cfg.app_data(web::Data::new(api))
        .app_data(web::Data::new(test_server_config()))
        .route("/webhook/account", web::post().to(account_webhook::<MockEscrowDb, MockProcessor>));
}
