use chrono::{DateTime, Utc};
use meg_common::Money;
use thiserror::Error;

use crate::{
    db_types::{DisputeStatus, Listing, NewTransaction, SellerTier, Transaction, TransactionStatus, UserProfile},
    traits::data_objects::ConnectedAccountState,
};

/// Seed data for a user payment profile. Account CRUD is owned by an external service; the
/// engine only needs enough of the record to broker sales.
#[derive(Debug, Clone)]
pub struct NewUserProfile {
    pub user_id: String,
    pub connected_account_id: Option<String>,
    pub tier: SellerTier,
    pub is_admin: bool,
    pub banned: bool,
}

impl NewUserProfile {
    pub fn new<S: Into<String>>(user_id: S) -> Self {
        Self { user_id: user_id.into(), connected_account_id: None, tier: SellerTier::Free, is_admin: false, banned: false }
    }
}

/// The storage backend contract for the escrow engine.
///
/// The transaction row is the unit of mutual exclusion. Every state-changing method is a
/// compare-and-swap guarded by the expected prior status: when the guard does not match, the
/// method returns `Ok(None)` (a no-op) rather than corrupting state. This is the primary defence
/// against webhook redelivery and overlapping job runs.
#[allow(async_fn_in_trait)]
pub trait EscrowDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    // ------------------------------ listings and users (collaborator-owned) -----------------------------
    async fn fetch_listing(&self, listing_id: &str) -> Result<Option<Listing>, EscrowDatabaseError>;

    /// Insert or replace a listing record. Listing CRUD is owned by the marketplace service;
    /// this exists for mirroring its records into the engine's store.
    async fn upsert_listing(&self, listing: &Listing) -> Result<(), EscrowDatabaseError>;

    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>, EscrowDatabaseError>;

    async fn upsert_user(&self, user: &NewUserProfile) -> Result<UserProfile, EscrowDatabaseError>;

    /// Overwrite the cached connected-account fields for whichever user owns `account_id`, from
    /// a fresh authoritative fetch. Returns `None` when no user is linked to the account.
    async fn update_account_state(
        &self,
        account_id: &str,
        state: &ConnectedAccountState,
    ) -> Result<Option<UserProfile>, EscrowDatabaseError>;

    /// Handle an account disconnection: clear the connected-account id and reset the cached
    /// payout flags. Returns `None` when no user is linked to the account.
    async fn clear_connected_account(&self, account_id: &str) -> Result<Option<UserProfile>, EscrowDatabaseError>;

    // ------------------------------------------ transactions --------------------------------------------
    /// Persist a brand-new transaction in `Pending` with funds held. Fails when a transaction
    /// already exists for the same payment authorization.
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, EscrowDatabaseError>;

    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, EscrowDatabaseError>;

    async fn fetch_transaction_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Transaction>, EscrowDatabaseError>;

    /// CAS `Pending → PaymentReceived`, recording the processor's verbatim status string.
    /// `Ok(None)` when the transaction is not in `Pending` (duplicate delivery is a no-op).
    async fn mark_payment_received(
        &self,
        payment_intent_id: &str,
        payment_status: &str,
    ) -> Result<Option<Transaction>, EscrowDatabaseError>;

    /// Record the processor's status string without a state change (e.g. a failed payment).
    async fn record_payment_status(&self, payment_intent_id: &str, payment_status: &str)
        -> Result<(), EscrowDatabaseError>;

    /// CAS `PaymentReceived → Shipped`, storing the tracking number and carrier.
    async fn record_shipment(
        &self,
        id: i64,
        tracking_number: &str,
        carrier: crate::db_types::Carrier,
    ) -> Result<Option<Transaction>, EscrowDatabaseError>;

    /// All transactions in `Shipped` with a tracking number, oldest first. The candidate set for
    /// the delivery reconciliation job; already-delivered rows are excluded by the filter, which
    /// is what makes overlapping runs safe.
    async fn fetch_shipped_with_tracking(&self) -> Result<Vec<Transaction>, EscrowDatabaseError>;

    /// CAS `Shipped → Delivered`, recording the carrier's delivery timestamp and the escrow
    /// release deadline.
    async fn mark_delivered(
        &self,
        id: i64,
        delivered_at: DateTime<Utc>,
        escrow_release_at: DateTime<Utc>,
    ) -> Result<Option<Transaction>, EscrowDatabaseError>;

    /// Transactions eligible for escrow release: `Delivered`, funds held, deadline passed, no
    /// open dispute.
    async fn fetch_release_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Transaction>, EscrowDatabaseError>;

    /// CAS `Delivered → Completed` (funds-held flag cleared, completion stamped) and flip the
    /// associated listing to `Sold`, atomically. The guard re-checks the open-dispute condition
    /// so a racing dispute-open and release cannot both succeed.
    async fn mark_completed(&self, id: i64) -> Result<Option<Transaction>, EscrowDatabaseError>;

    /// CAS `{Shipped, Delivered} → Disputed` with an open dispute and the given reason. Funds
    /// remain held.
    async fn open_dispute(&self, id: i64, reason: &str) -> Result<Option<Transaction>, EscrowDatabaseError>;

    /// CAS `Disputed → final_status`, recording the outcome classification and any refunded
    /// amount, and clearing the funds-held flag.
    async fn resolve_dispute(
        &self,
        id: i64,
        outcome: DisputeStatus,
        refunded: Option<Money>,
        final_status: TransactionStatus,
    ) -> Result<Option<Transaction>, EscrowDatabaseError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), EscrowDatabaseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum EscrowDatabaseError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("A transaction already exists for payment authorization {0}")]
    DuplicateTransaction(String),
    #[error("The requested transaction (id {0}) does not exist")]
    TransactionNotFound(i64),
    #[error("No transaction exists for payment authorization {0}")]
    PaymentIntentNotFound(String),
    #[error("The requested listing {0} does not exist")]
    ListingNotFound(String),
    #[error("The requested user {0} does not exist")]
    UserNotFound(String),
}

impl From<sqlx::Error> for EscrowDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        EscrowDatabaseError::DatabaseError(e.to_string())
    }
}
