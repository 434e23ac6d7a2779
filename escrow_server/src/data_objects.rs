use std::fmt::Display;

use escrow_engine::db_types::{Carrier, DisputeResolution, ShippingAddress};
use meg_common::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Checkout body. The buyer is taken from the access token, never from the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPayload {
    pub listing_id: String,
    /// The price the buyer saw, in cents.
    pub expected_price: Money,
    pub ship_to: ShippingAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentPayload {
    pub tracking_number: String,
    /// Optional; inferred from the tracking number format when absent.
    #[serde(default)]
    pub carrier: Option<Carrier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputePayload {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionPayload {
    pub resolution: DisputeResolution,
    /// Required for split resolutions, in cents.
    #[serde(default)]
    pub split_amount: Option<Money>,
    #[serde(default)]
    pub reason: String,
}
