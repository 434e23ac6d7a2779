use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Duration;
use escrow_engine::{events::EventProducers, TransactionFlowApi};

use super::{
    helpers::{send, test_server_config, TEST_JOB_TOKEN},
    mocks::MockEscrowDb,
};
use crate::jobs::trigger_escrow_release;

#[actix_web::test]
async fn job_triggers_without_a_bearer_token_are_denied() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/jobs/escrow-release");
    let (status, body) = send(req, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Missing job token"), "was: {body}");
}

#[actix_web::test]
async fn job_triggers_with_the_wrong_token_are_denied() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/jobs/escrow-release")
        .insert_header(("Authorization", "Bearer not-the-job-token"));
    let (status, body) = send(req, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid job token"), "was: {body}");
}

#[actix_web::test]
async fn a_valid_token_runs_the_release_job() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/jobs/escrow-release")
        .insert_header(("Authorization", format!("Bearer {TEST_JOB_TOKEN}")));
    let (status, body) = send(req, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""released":[]"#), "was: {body}");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_fetch_release_candidates().returning(|_| Ok(vec![]));
    let api = TransactionFlowApi::new(db, EventProducers::default(), Duration::hours(24), std::time::Duration::ZERO);
    cfg.app_data(web::Data::new(api))
        .app_data(web::Data::new(test_server_config()))
        .route("/jobs/escrow-release", web::post().to(trigger_escrow_release::<MockEscrowDb>));
}
