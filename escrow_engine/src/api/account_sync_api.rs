use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    api::errors::AccountSyncError,
    db_types::UserProfile,
    traits::{EscrowDatabase, PaymentProcessor},
};

/// A connected-account notification from the processor. Payloads are treated as untrusted
/// pointers: the synchroniser always re-fetches the authoritative state rather than applying any
/// fields from the event body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountEvent {
    Updated { account_id: String },
    Deauthorized { account_id: String },
}

/// `AccountSyncApi` keeps the cached connected-account state on user profiles in step with the
/// processor.
pub struct AccountSyncApi<B, P> {
    db: B,
    processor: P,
}

impl<B, P> Debug for AccountSyncApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountSyncApi")
    }
}

impl<B, P> AccountSyncApi<B, P>
where
    B: EscrowDatabase,
    P: PaymentProcessor,
{
    pub fn new(db: B, processor: P) -> Self {
        Self { db, processor }
    }

    pub async fn process_account_event(&self, event: AccountEvent) -> Result<UserProfile, AccountSyncError> {
        match event {
            AccountEvent::Updated { account_id } => self.sync_account(&account_id).await,
            AccountEvent::Deauthorized { account_id } => self.disconnect_account(&account_id).await,
        }
    }

    /// Fetch the authoritative account state and overwrite the local cache. Events can arrive out
    /// of order, so the event body is never trusted; the fresh fetch is.
    pub async fn sync_account(&self, account_id: &str) -> Result<UserProfile, AccountSyncError> {
        let state = self.processor.fetch_account_state(account_id).await?;
        let profile = self
            .db
            .update_account_state(account_id, &state)
            .await?
            .ok_or_else(|| AccountSyncError::UnknownAccount(account_id.to_string()))?;
        info!(
            "🔗️ Account [{account_id}] synced for user [{}]: status {}, payouts {}",
            profile.user_id, profile.account_status, profile.payouts_enabled
        );
        Ok(profile)
    }

    /// Handle a deauthorization: unlink the account and reset the cached payout flags, so the
    /// seller fails the payable check until they reconnect.
    pub async fn disconnect_account(&self, account_id: &str) -> Result<UserProfile, AccountSyncError> {
        let profile = self
            .db
            .clear_connected_account(account_id)
            .await?
            .ok_or_else(|| AccountSyncError::UnknownAccount(account_id.to_string()))?;
        warn!("🔗️ Account [{account_id}] deauthorized. User [{}] can no longer sell.", profile.user_id);
        Ok(profile)
    }
}
