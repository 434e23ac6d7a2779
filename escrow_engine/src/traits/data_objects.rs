use chrono::{DateTime, Utc};
use meg_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::Carrier;

//--------------------------------------  Processor objects  ---------------------------------------------------------
/// A request to authorize a charge with the payment processor.
///
/// Under the destination-charge model the single authorization carries the split: the
/// application fee is retained by the platform and the remainder is transferred to the seller's
/// connected account at authorization time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthorization {
    pub amount: Money,
    pub currency: String,
    /// The seller's connected account. `None` for admin sellers, who are paid directly.
    pub destination_account: Option<String>,
    pub application_fee: Money,
    pub description: String,
}

/// The processor's response to a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAuthorization {
    pub id: String,
    /// Client-side confirmation secret, returned to the buyer.
    pub client_secret: String,
    /// The processor's own status string, stored verbatim.
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub id: String,
    pub amount: Money,
}

/// The authoritative connected-account state as reported by the processor. The local copy on the
/// user profile is always a cache of this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccountState {
    pub status: String,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub onboarding_complete: bool,
}

//--------------------------------------  Tracking objects   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentState {
    InTransit,
    OutForDelivery,
    Delivered,
    Exception,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStatus {
    pub carrier: Option<Carrier>,
    pub state: ShipmentState,
    pub delivered_at: Option<DateTime<Utc>>,
}

//--------------------------------------    Run reports      ---------------------------------------------------------
/// Aggregate result of one delivery-reconciliation run. Per-item failures are counted, not fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryRunReport {
    pub checked: usize,
    pub delivered: usize,
    pub in_transit: usize,
    pub errors: Vec<(i64, String)>,
}

impl DeliveryRunReport {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Aggregate result of one escrow-release run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseRunReport {
    pub released: Vec<i64>,
    pub errors: Vec<(i64, String)>,
}

impl ReleaseRunReport {
    pub fn released_count(&self) -> usize {
        self.released.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
