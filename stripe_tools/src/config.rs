use log::*;
use meg_common::Secret;

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub api_url: String,
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("MEG_STRIPE_API_URL").unwrap_or_else(|_| {
            debug!("MEG_STRIPE_API_URL not set, using the live endpoint");
            "https://api.stripe.com".to_string()
        });
        let secret_key = Secret::new(std::env::var("MEG_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("MEG_STRIPE_SECRET_KEY not set, using a (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("MEG_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("MEG_STRIPE_WEBHOOK_SECRET not set, using a (probably useless) default");
            "whsec_00000000000000".to_string()
        }));
        Self { api_url, secret_key, webhook_secret }
    }
}
