use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Listing, ListingStatus},
    traits::EscrowDatabaseError,
};

pub async fn fetch_listing(listing_id: &str, conn: &mut SqliteConnection) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM listings WHERE id = $1").bind(listing_id).fetch_optional(conn).await
}

/// Insert or replace a listing record mirrored from the marketplace service.
pub async fn upsert_listing(listing: &Listing, conn: &mut SqliteConnection) -> Result<(), EscrowDatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO listings (id, seller_id, price, status, device_type, views)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                seller_id = excluded.seller_id,
                price = excluded.price,
                status = excluded.status,
                device_type = excluded.device_type,
                views = excluded.views,
                updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(&listing.id)
    .bind(&listing.seller_id)
    .bind(listing.price)
    .bind(listing.status)
    .bind(&listing.device_type)
    .bind(listing.views)
    .execute(conn)
    .await?;
    Ok(())
}

/// Marks the listing as `Sold`. Only an `Active` listing can be sold.
pub async fn mark_listing_sold(listing_id: &str, conn: &mut SqliteConnection) -> Result<bool, EscrowDatabaseError> {
    let result = sqlx::query("UPDATE listings SET status = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND status = $3")
        .bind(listing_id)
        .bind(ListingStatus::Sold)
        .bind(ListingStatus::Active)
        .execute(conn)
        .await?;
    let updated = result.rows_affected() > 0;
    if updated {
        debug!("🗃️ Listing [{listing_id}] marked as sold");
    }
    Ok(updated)
}
