use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::Duration;
use log::debug;
use meg_common::Secret;
use serde_json::Value;

use stripe_tools::StripeConfig;

use crate::{
    auth::{Role, TokenIssuer, AUTH_HEADER},
    config::{AuthConfig, ServerConfig},
};

pub const TEST_JOB_TOKEN: &str = "test-job-token-do-not-reuse";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_endpoint_test_secret";

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new("endpoint-test-secret-0123456789abcdef".to_string()) }
}

pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        auth: test_auth_config(),
        job_token: Secret::new(TEST_JOB_TOKEN.to_string()),
        stripe: StripeConfig {
            webhook_secret: Secret::new(TEST_WEBHOOK_SECRET.to_string()),
            ..StripeConfig::default()
        },
        ..ServerConfig::default()
    }
}

pub fn issue_token(user_id: &str, roles: Vec<Role>) -> String {
    issue_token_with_validity(user_id, roles, Duration::hours(1))
}

pub fn issue_token_with_validity(user_id: &str, roles: Vec<Role>, validity: Duration) -> String {
    TokenIssuer::new(&test_auth_config()).issue(user_id, roles, validity).expect("Failed to sign token")
}

pub async fn get_request(auth_header: &str, path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let mut req = TestRequest::get().uri(path);
    if !auth_header.is_empty() {
        req = req.insert_header((AUTH_HEADER, auth_header));
    }
    send(req, configure).await
}

pub async fn post_request(
    auth_header: &str,
    path: &str,
    body: Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).set_json(body);
    if !auth_header.is_empty() {
        req = req.insert_header((AUTH_HEADER, auth_header));
    }
    send(req, configure).await
}

pub async fn send(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let jwt_signer = TokenIssuer::new(&test_auth_config());
    let app = App::new().app_data(web::Data::new(jwt_signer)).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::call_service(&service, req.to_request()).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}
