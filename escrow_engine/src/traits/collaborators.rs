use meg_common::Money;
use thiserror::Error;

use crate::{
    db_types::Carrier,
    traits::data_objects::{ConnectedAccountState, NewAuthorization, PaymentAuthorization, RefundReceipt, TrackingStatus},
};

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("Payment processor rejected the request: {0}")]
    Api(String),
    #[error("Could not reach the payment processor: {0}")]
    Network(String),
    #[error("Unexpected response from the payment processor: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum TrackingError {
    #[error("Could not reach the carrier tracking service: {0}")]
    Network(String),
    #[error("Tracking number not found: {0}")]
    NotFound(String),
    #[error("Unexpected response from the carrier tracking service: {0}")]
    InvalidResponse(String),
}

/// The contract this system requires of the external payment processor.
///
/// The processor is authoritative for money movement. Every method is a blocking network call;
/// callers must never hold a database transaction open across one.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor: Clone + Send + Sync {
    /// Create a payment authorization for the given amount. For non-admin sellers the request
    /// carries a destination-transfer instruction and an application fee.
    async fn create_authorization(&self, req: NewAuthorization) -> Result<PaymentAuthorization, ProcessorError>;

    /// Refund part or all of a charge. `amount = None` refunds the full charge.
    async fn issue_refund(
        &self,
        payment_intent_id: &str,
        amount: Option<Money>,
        reason: &str,
    ) -> Result<RefundReceipt, ProcessorError>;

    /// Fetch the authoritative state of a connected account.
    async fn fetch_account_state(&self, account_id: &str) -> Result<ConnectedAccountState, ProcessorError>;
}

/// Carrier-tracking lookup. Implementations are expected to be rate limited; the delivery
/// reconciliation job paces its calls accordingly.
#[allow(async_fn_in_trait)]
pub trait CarrierTracking: Send + Sync {
    async fn get_status(&self, tracking_number: &str, carrier: Option<Carrier>) -> Result<TrackingStatus, TrackingError>;
}

/// User notification delivery. Fire-and-forget: implementations log failures internally, because
/// a notification failure must never roll back a transaction-state change.
#[allow(async_fn_in_trait)]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, kind: &str, title: &str, message: &str, link: &str);
}
