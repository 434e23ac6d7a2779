use chrono::{DateTime, Utc};
use log::debug;
use meg_common::Money;
use sqlx::SqlitePool;

use crate::{
    db_types::{Carrier, DisputeStatus, Listing, NewTransaction, Transaction, TransactionStatus, UserProfile},
    sqlite::db::{self, listings, transactions, users},
    traits::{ConnectedAccountState, EscrowDatabase, EscrowDatabaseError, NewUserProfile},
};

/// The SQLite-backed storage implementation.
#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase").field("url", &self.url).finish()
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool against the URL in `MEG_DATABASE_URL` and runs any pending
    /// migrations.
    pub async fn new(max_connections: u32) -> Result<Self, EscrowDatabaseError> {
        let url = db::db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, EscrowDatabaseError> {
        let pool = db::new_pool(url, max_connections).await?;
        db::run_migrations(&pool).await.map_err(|e| EscrowDatabaseError::DatabaseError(e.to_string()))?;
        debug!("🗃️ Database migrations are up to date");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl EscrowDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_listing(&self, listing_id: &str) -> Result<Option<Listing>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(listings::fetch_listing(listing_id, &mut conn).await?)
    }

    async fn upsert_listing(&self, listing: &Listing) -> Result<(), EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        listings::upsert_listing(listing, &mut conn).await
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user(user_id, &mut conn).await?)
    }

    async fn upsert_user(&self, user: &NewUserProfile) -> Result<UserProfile, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        users::upsert_user(user, &mut conn).await
    }

    async fn update_account_state(
        &self,
        account_id: &str,
        state: &ConnectedAccountState,
    ) -> Result<Option<UserProfile>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        users::update_account_state(account_id, state, &mut conn).await
    }

    async fn clear_connected_account(&self, account_id: &str) -> Result<Option<UserProfile>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        users::clear_connected_account(account_id, &mut conn).await
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        transactions::insert_transaction(tx, &mut conn).await
    }

    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_transaction(id, &mut conn).await?)
    }

    async fn fetch_transaction_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Transaction>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_by_payment_intent(payment_intent_id, &mut conn).await?)
    }

    async fn mark_payment_received(
        &self,
        payment_intent_id: &str,
        payment_status: &str,
    ) -> Result<Option<Transaction>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        transactions::mark_payment_received(payment_intent_id, payment_status, &mut conn).await
    }

    async fn record_payment_status(
        &self,
        payment_intent_id: &str,
        payment_status: &str,
    ) -> Result<(), EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        transactions::record_payment_status(payment_intent_id, payment_status, &mut conn).await
    }

    async fn record_shipment(
        &self,
        id: i64,
        tracking_number: &str,
        carrier: Carrier,
    ) -> Result<Option<Transaction>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        transactions::record_shipment(id, tracking_number, carrier, &mut conn).await
    }

    async fn fetch_shipped_with_tracking(&self) -> Result<Vec<Transaction>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_shipped_with_tracking(&mut conn).await?)
    }

    async fn mark_delivered(
        &self,
        id: i64,
        delivered_at: DateTime<Utc>,
        escrow_release_at: DateTime<Utc>,
    ) -> Result<Option<Transaction>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        transactions::mark_delivered(id, delivered_at, escrow_release_at, &mut conn).await
    }

    async fn fetch_release_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Transaction>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_release_candidates(now, &mut conn).await?)
    }

    /// The state flip and the listing flip commit together or not at all.
    async fn mark_completed(&self, id: i64) -> Result<Option<Transaction>, EscrowDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let result = transactions::mark_completed(id, &mut tx).await?;
        if let Some(completed) = &result {
            if !listings::mark_listing_sold(&completed.listing_id, &mut tx).await? {
                // Listing was already flipped by an earlier sale attempt. Not an error.
                debug!("🗃️ Listing [{}] was already non-active when transaction #{id} completed", completed.listing_id);
            }
        }
        tx.commit().await?;
        Ok(result)
    }

    async fn open_dispute(&self, id: i64, reason: &str) -> Result<Option<Transaction>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        transactions::open_dispute(id, reason, &mut conn).await
    }

    async fn resolve_dispute(
        &self,
        id: i64,
        outcome: DisputeStatus,
        refunded: Option<Money>,
        final_status: TransactionStatus,
    ) -> Result<Option<Transaction>, EscrowDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        transactions::resolve_dispute(id, outcome, refunded, final_status, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), EscrowDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}
