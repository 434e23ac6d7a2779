//! A minimal client for the slice of the Stripe API this system uses: payment intents with
//! destination charges, refunds, connected accounts, events and webhook signature verification.
mod api;
mod config;
mod error;
mod webhooks;

mod data_objects;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{StripeAccount, StripeEvent, StripePaymentIntent, StripeRefund};
pub use error::StripeApiError;
pub use webhooks::{verify_webhook_signature, WebhookVerificationError, DEFAULT_SIGNATURE_TOLERANCE_SECS};
