//! Shared scaffolding for the integration tests: database setup, seed data and hand-rolled mock
//! collaborators.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use escrow_engine::{
    db_types::{Carrier, Listing, ListingStatus, SellerTier, ShippingAddress, UserProfile},
    traits::{
        CarrierTracking,
        ConnectedAccountState,
        EscrowDatabase,
        NewAuthorization,
        NewUserProfile,
        PaymentAuthorization,
        PaymentProcessor,
        ProcessorError,
        RefundReceipt,
        TrackingError,
        TrackingStatus,
    },
    SqliteDatabase,
};
use log::*;
use meg_common::Money;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
}

pub fn random_db_path() -> String {
    format!("sqlite://../data/test_escrow_{}.db", rand::random::<u64>())
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database")
}

//--------------------------------------     Seed data       ---------------------------------------------------------

pub async fn seed_buyer(db: &SqliteDatabase, user_id: &str) -> UserProfile {
    db.upsert_user(&NewUserProfile::new(user_id)).await.expect("Error seeding buyer")
}

/// Seeds a seller with a fully onboarded connected account, able to receive payouts.
pub async fn seed_seller(db: &SqliteDatabase, user_id: &str, account_id: &str, tier: SellerTier) -> UserProfile {
    let mut profile = NewUserProfile::new(user_id);
    profile.connected_account_id = Some(account_id.to_string());
    profile.tier = tier;
    db.upsert_user(&profile).await.expect("Error seeding seller");
    let state = ConnectedAccountState {
        status: "active".to_string(),
        charges_enabled: true,
        payouts_enabled: true,
        onboarding_complete: true,
    };
    db.update_account_state(account_id, &state).await.expect("Error enabling seller payouts").expect("Seller not found")
}

pub async fn seed_listing(db: &SqliteDatabase, listing_id: &str, seller_id: &str, price: Money) -> Listing {
    let listing = Listing {
        id: listing_id.to_string(),
        seller_id: seller_id.to_string(),
        price,
        status: ListingStatus::Active,
        device_type: "phone".to_string(),
        views: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    db.upsert_listing(&listing).await.expect("Error seeding listing");
    listing
}

pub fn ship_to(postal_code: &str) -> ShippingAddress {
    ShippingAddress {
        name: "Pat Example".to_string(),
        line1: "1 Main St".to_string(),
        line2: None,
        city: "Portland".to_string(),
        postal_code: postal_code.to_string(),
    }
}

/// A UPS tracking number: 1Z followed by 16 alphanumerics.
pub const UPS_TRACKING: &str = "1Z999AA10123456784";

//--------------------------------------   Mock processor    ---------------------------------------------------------

#[derive(Default)]
struct ProcessorState {
    next_id: u64,
    authorizations: Vec<NewAuthorization>,
    refunds: Vec<(String, Option<Money>, String)>,
    fail_refunds: bool,
    accounts: HashMap<String, ConnectedAccountState>,
}

/// Scriptable in-memory stand-in for the payment processor.
#[derive(Clone, Default)]
pub struct MockProcessor {
    state: Arc<Mutex<ProcessorState>>,
}

impl MockProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_refunds(&self, fail: bool) {
        self.state.lock().unwrap().fail_refunds = fail;
    }

    pub fn set_account_state(&self, account_id: &str, state: ConnectedAccountState) {
        self.state.lock().unwrap().accounts.insert(account_id.to_string(), state);
    }

    pub fn authorizations(&self) -> Vec<NewAuthorization> {
        self.state.lock().unwrap().authorizations.clone()
    }

    pub fn refunds(&self) -> Vec<(String, Option<Money>, String)> {
        self.state.lock().unwrap().refunds.clone()
    }
}

impl PaymentProcessor for MockProcessor {
    async fn create_authorization(&self, req: NewAuthorization) -> Result<PaymentAuthorization, ProcessorError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("pi_test_{}", state.next_id);
        state.authorizations.push(req);
        Ok(PaymentAuthorization {
            id: id.clone(),
            client_secret: format!("{id}_secret"),
            status: "requires_confirmation".to_string(),
        })
    }

    async fn issue_refund(
        &self,
        payment_intent_id: &str,
        amount: Option<Money>,
        reason: &str,
    ) -> Result<RefundReceipt, ProcessorError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_refunds {
            return Err(ProcessorError::Api("refunds are disabled for this test".to_string()));
        }
        state.refunds.push((payment_intent_id.to_string(), amount, reason.to_string()));
        Ok(RefundReceipt { id: format!("re_test_{}", state.refunds.len()), amount: amount.unwrap_or(Money::ZERO) })
    }

    async fn fetch_account_state(&self, account_id: &str) -> Result<ConnectedAccountState, ProcessorError> {
        let state = self.state.lock().unwrap();
        state
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| ProcessorError::Api(format!("no such account: {account_id}")))
    }
}

//--------------------------------------    Mock tracker     ---------------------------------------------------------

/// Scriptable carrier-tracking lookup keyed by tracking number.
#[derive(Clone, Default)]
pub struct MockTracker {
    statuses: Arc<Mutex<HashMap<String, TrackingStatus>>>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, tracking_number: &str, status: TrackingStatus) {
        self.statuses.lock().unwrap().insert(tracking_number.to_string(), status);
    }
}

impl CarrierTracking for MockTracker {
    async fn get_status(&self, tracking_number: &str, _carrier: Option<Carrier>) -> Result<TrackingStatus, TrackingError> {
        self.statuses
            .lock()
            .unwrap()
            .get(tracking_number)
            .cloned()
            .ok_or_else(|| TrackingError::NotFound(tracking_number.to_string()))
    }
}
