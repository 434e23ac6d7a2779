use std::env;

use chrono::Duration;
use log::*;
use meg_common::{helpers::parse_boolean_flag, Secret};
use rand::distributions::{Alphanumeric, DistString};
use stripe_tools::StripeConfig;

use crate::errors::ServerError;

const DEFAULT_MEG_HOST: &str = "127.0.0.1";
const DEFAULT_MEG_PORT: u16 = 8480;
const DEFAULT_ESCROW_HOLD_HOURS: i64 = 24;
const DEFAULT_DELIVERY_PACE_MS: u64 = 500;
const DEFAULT_WORKER_INTERVAL_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// Shared secret for the job-trigger endpoints. Required: the server refuses to start
    /// without one, because an unguarded trigger endpoint is an open invitation.
    pub job_token: Secret<String>,
    /// How long funds stay in escrow after a confirmed delivery.
    pub escrow_hold: Duration,
    /// Minimum gap between consecutive carrier lookups in one reconciliation run.
    pub delivery_pace: std::time::Duration,
    /// When true, an in-process worker drives the delivery and release jobs on an interval, for
    /// deployments without an external scheduler.
    pub enable_worker: bool,
    pub worker_interval: std::time::Duration,
    pub stripe: StripeConfig,
    /// Base URL of the carrier tracking aggregation service.
    pub tracking_api_url: String,
    /// Notification service endpoint. When unset, notifications are logged instead of sent.
    pub notify_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HS256 signing secret for the API's bearer tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🪛️ MEG_JWT_SECRET is not set. Generating a random secret; all issued tokens will be invalidated when \
             the server restarts."
        );
        let secret = Alphanumeric.sample_string(&mut rand::thread_rng(), 48);
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        env::var("MEG_JWT_SECRET").map(|s| Self { jwt_secret: Secret::new(s) }).unwrap_or_default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MEG_HOST.to_string(),
            port: DEFAULT_MEG_PORT,
            database_url: String::default(),
            auth: AuthConfig::from_env_or_default(),
            job_token: Secret::default(),
            escrow_hold: Duration::hours(DEFAULT_ESCROW_HOLD_HOURS),
            delivery_pace: std::time::Duration::from_millis(DEFAULT_DELIVERY_PACE_MS),
            enable_worker: false,
            worker_interval: std::time::Duration::from_secs(DEFAULT_WORKER_INTERVAL_SECS),
            stripe: StripeConfig::default(),
            tracking_api_url: String::default(),
            notify_url: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Result<Self, ServerError> {
        let host = env::var("MEG_HOST").ok().unwrap_or_else(|| DEFAULT_MEG_HOST.into());
        let port = env::var("MEG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MEG_PORT. {e} Using the default, {DEFAULT_MEG_PORT}, instead."
                    );
                    DEFAULT_MEG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MEG_PORT);
        let database_url = env::var("MEG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MEG_DATABASE_URL is not set. Please set it to the URL of the escrow database.");
            String::default()
        });
        let auth = AuthConfig::from_env_or_default();
        let job_token = env::var("MEG_JOB_TOKEN").map(Secret::new).map_err(|_| {
            ServerError::ConfigurationError(
                "MEG_JOB_TOKEN is not set. The job trigger endpoints cannot run unguarded.".to_string(),
            )
        })?;
        let escrow_hold = env::var("MEG_ESCROW_HOLD_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::hours)
            .unwrap_or_else(|| {
                info!("🪛️ MEG_ESCROW_HOLD_HOURS not set. Using {DEFAULT_ESCROW_HOLD_HOURS}h.");
                Duration::hours(DEFAULT_ESCROW_HOLD_HOURS)
            });
        let delivery_pace = std::time::Duration::from_millis(
            env::var("MEG_DELIVERY_PACE_MS").ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(DEFAULT_DELIVERY_PACE_MS),
        );
        let enable_worker = parse_boolean_flag(env::var("MEG_ENABLE_WORKER").ok(), false);
        let worker_interval = std::time::Duration::from_secs(
            env::var("MEG_WORKER_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_WORKER_INTERVAL_SECS),
        );
        let stripe = StripeConfig::new_from_env_or_default();
        let tracking_api_url = env::var("MEG_TRACKING_API_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MEG_TRACKING_API_URL not set, using a (probably useless) default");
            "https://tracking.example.com".to_string()
        });
        let notify_url = env::var("MEG_NOTIFY_URL").ok();
        if notify_url.is_none() {
            info!("🪛️ MEG_NOTIFY_URL not set. Notifications will be logged, not delivered.");
        }
        Ok(Self {
            host,
            port,
            database_url,
            auth,
            job_token,
            escrow_hold,
            delivery_pace,
            enable_worker,
            worker_interval,
            stripe,
            tracking_api_url,
            notify_url,
        })
    }
}
