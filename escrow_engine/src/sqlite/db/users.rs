use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::UserProfile,
    traits::{ConnectedAccountState, EscrowDatabaseError, NewUserProfile},
};

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE user_id = $1").bind(user_id).fetch_optional(conn).await
}

pub async fn fetch_user_by_account(
    account_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE connected_account_id = $1").bind(account_id).fetch_optional(conn).await
}

pub async fn upsert_user(user: &NewUserProfile, conn: &mut SqliteConnection) -> Result<UserProfile, EscrowDatabaseError> {
    let mut rows: Vec<UserProfile> = sqlx::query_as(
        r#"
            INSERT INTO users (user_id, connected_account_id, tier, is_admin, banned)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                connected_account_id = excluded.connected_account_id,
                tier = excluded.tier,
                is_admin = excluded.is_admin,
                banned = excluded.banned,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(&user.user_id)
    .bind(&user.connected_account_id)
    .bind(user.tier)
    .bind(user.is_admin)
    .bind(user.banned)
    .fetch_all(conn)
    .await?;
    rows.pop().ok_or_else(|| sqlx::Error::RowNotFound.into())
}

/// Overwrites the cached connected-account fields with a fresh authoritative snapshot. The cache
/// is never merged with the incoming state, only replaced.
///
/// The RETURNING rows are drained with `fetch_all` so the update is fully applied before this
/// returns; `fetch_optional` can hand back the row while the write is still in flight.
pub async fn update_account_state(
    account_id: &str,
    state: &ConnectedAccountState,
    conn: &mut SqliteConnection,
) -> Result<Option<UserProfile>, EscrowDatabaseError> {
    let mut rows: Vec<UserProfile> = sqlx::query_as(
        r#"
            UPDATE users
            SET account_status = $2, charges_enabled = $3, payouts_enabled = $4,
                onboarding_complete = $5, updated_at = CURRENT_TIMESTAMP
            WHERE connected_account_id = $1
            RETURNING *;
        "#,
    )
    .bind(account_id)
    .bind(&state.status)
    .bind(state.charges_enabled)
    .bind(state.payouts_enabled)
    .bind(state.onboarding_complete)
    .fetch_all(conn)
    .await?;
    if let Some(p) = rows.last() {
        debug!("🗃️ Account state for user [{}] synced from account [{account_id}]", p.user_id);
    }
    Ok(rows.pop())
}

/// Detaches a connected account after deauthorization and resets the cached payout flags, so the
/// user cannot sell again until they reconnect.
pub async fn clear_connected_account(
    account_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UserProfile>, EscrowDatabaseError> {
    let mut rows: Vec<UserProfile> = sqlx::query_as(
        r#"
            UPDATE users
            SET connected_account_id = NULL, account_status = 'disconnected',
                charges_enabled = 0, payouts_enabled = 0, onboarding_complete = 0,
                updated_at = CURRENT_TIMESTAMP
            WHERE connected_account_id = $1
            RETURNING *;
        "#,
    )
    .bind(account_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.pop())
}
