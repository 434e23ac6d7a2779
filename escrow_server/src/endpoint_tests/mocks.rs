use chrono::{DateTime, TimeZone, Utc};
use escrow_engine::{
    db_types::{Carrier, DisputeStatus, Listing, NewTransaction, Transaction, TransactionStatus, UserProfile},
    traits::{
        ConnectedAccountState,
        EscrowDatabase,
        EscrowDatabaseError,
        NewAuthorization,
        NewUserProfile,
        PaymentAuthorization,
        PaymentProcessor,
        ProcessorError,
        RefundReceipt,
    },
};
use meg_common::Money;
use mockall::mock;

mock! {
    pub EscrowDb {}

    impl Clone for EscrowDb {
        fn clone(&self) -> Self;
    }

    impl EscrowDatabase for EscrowDb {
        fn url(&self) -> &str;
        async fn fetch_listing(&self, listing_id: &str) -> Result<Option<Listing>, EscrowDatabaseError>;
        async fn upsert_listing(&self, listing: &Listing) -> Result<(), EscrowDatabaseError>;
        async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>, EscrowDatabaseError>;
        async fn upsert_user(&self, user: &NewUserProfile) -> Result<UserProfile, EscrowDatabaseError>;
        async fn update_account_state(&self, account_id: &str, state: &ConnectedAccountState) -> Result<Option<UserProfile>, EscrowDatabaseError>;
        async fn clear_connected_account(&self, account_id: &str) -> Result<Option<UserProfile>, EscrowDatabaseError>;
        async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, EscrowDatabaseError>;
        async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, EscrowDatabaseError>;
        async fn fetch_transaction_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Transaction>, EscrowDatabaseError>;
        async fn mark_payment_received(&self, payment_intent_id: &str, payment_status: &str) -> Result<Option<Transaction>, EscrowDatabaseError>;
        async fn record_payment_status(&self, payment_intent_id: &str, payment_status: &str) -> Result<(), EscrowDatabaseError>;
        async fn record_shipment(&self, id: i64, tracking_number: &str, carrier: Carrier) -> Result<Option<Transaction>, EscrowDatabaseError>;
        async fn fetch_shipped_with_tracking(&self) -> Result<Vec<Transaction>, EscrowDatabaseError>;
        async fn mark_delivered(&self, id: i64, delivered_at: DateTime<Utc>, escrow_release_at: DateTime<Utc>) -> Result<Option<Transaction>, EscrowDatabaseError>;
        async fn fetch_release_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Transaction>, EscrowDatabaseError>;
        async fn mark_completed(&self, id: i64) -> Result<Option<Transaction>, EscrowDatabaseError>;
        async fn open_dispute(&self, id: i64, reason: &str) -> Result<Option<Transaction>, EscrowDatabaseError>;
        async fn resolve_dispute(&self, id: i64, outcome: DisputeStatus, refunded: Option<Money>, final_status: TransactionStatus) -> Result<Option<Transaction>, EscrowDatabaseError>;
    }
}

mock! {
    pub Processor {}

    impl Clone for Processor {
        fn clone(&self) -> Self;
    }

    impl PaymentProcessor for Processor {
        async fn create_authorization(&self, req: NewAuthorization) -> Result<PaymentAuthorization, ProcessorError>;
        async fn issue_refund(&self, payment_intent_id: &str, amount: Option<Money>, reason: &str) -> Result<RefundReceipt, ProcessorError>;
        async fn fetch_account_state(&self, account_id: &str) -> Result<ConnectedAccountState, ProcessorError>;
    }
}

/// A completed-checkout transaction between `buyer-alice` and `seller-bob`, sitting in escrow.
pub fn sample_transaction() -> Transaction {
    let created = Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap();
    Transaction {
        id: 1,
        buyer_id: "buyer-alice".to_string(),
        seller_id: "seller-bob".to_string(),
        listing_id: "lst-0001".to_string(),
        sale_price: Money::from_cents(20_000),
        tax_rate_bps: 0,
        tax_amount: Money::ZERO,
        shipping_cost: Money::ZERO,
        platform_fee: Money::from_cents(200),
        processor_fee: Money::from_cents(610),
        seller_payout: Money::from_cents(19_190),
        total_amount: Money::from_cents(20_000),
        payment_intent_id: "pi_mock_0001".to_string(),
        payment_status: "succeeded".to_string(),
        status: TransactionStatus::PaymentReceived,
        funds_held: true,
        escrow_release_at: None,
        dispute_status: None,
        dispute_reason: None,
        refunded_amount: None,
        tracking_number: None,
        carrier: None,
        shipped_at: None,
        delivered_at: None,
        completed_at: None,
        ship_to_name: "Alice Tester".to_string(),
        ship_to_line1: "1 Test Lane".to_string(),
        ship_to_line2: None,
        ship_to_city: "Testville".to_string(),
        ship_to_postal_code: "90210".to_string(),
        created_at: created,
        updated_at: created,
    }
}
