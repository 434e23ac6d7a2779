use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fields of a Stripe payment intent this system cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    /// Absent when the intent is fetched with a restricted key.
    pub client_secret: Option<String>,
    pub status: String,
    /// Integer minor units, exactly as Stripe represents amounts.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub application_fee_amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeRefund {
    pub id: String,
    pub amount: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeAccount {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    /// Stripe's signal that onboarding finished.
    #[serde(default)]
    pub details_submitted: bool,
}

impl StripeAccount {
    /// The account's coarse status string as the rest of the system uses it.
    pub fn status(&self) -> &'static str {
        if self.charges_enabled && self.payouts_enabled {
            "active"
        } else if self.details_submitted {
            "restricted"
        } else {
            "pending"
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

/// A Stripe event envelope. Webhook payloads can be thin, so consumers should treat the embedded
/// object as a pointer and re-fetch anything authoritative.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
    #[serde(default)]
    pub account: Option<String>,
}
