use std::fmt::Debug;

use log::*;
use meg_common::{Money, CURRENCY_CODE_LOWER};
use serde::{Deserialize, Serialize};

use crate::{
    api::errors::CheckoutError,
    db_types::{ListingStatus, NewTransaction, ShippingAddress, Transaction},
    fees::{FeeBreakdown, FeeCalculator},
    traits::{EscrowDatabase, NewAuthorization, PaymentProcessor},
};

/// A buyer's request to purchase a listing. `expected_price` is the price the buyer saw when they
/// decided to buy; a stale page must never charge them a different amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub buyer_id: String,
    pub listing_id: String,
    pub expected_price: Money,
    pub ship_to: ShippingAddress,
}

/// The outcome of a successful checkout: the pending transaction and the client-side confirmation
/// secret for the payment authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub transaction: Transaction,
    pub client_secret: String,
    pub breakdown: FeeBreakdown,
}

/// `CheckoutApi` validates a purchase, prices it, authorizes the charge with the payment
/// processor and records the pending transaction.
pub struct CheckoutApi<B, P> {
    db: B,
    processor: P,
    calculator: FeeCalculator,
}

impl<B, P> Debug for CheckoutApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, P> CheckoutApi<B, P>
where
    B: EscrowDatabase,
    P: PaymentProcessor,
{
    pub fn new(db: B, processor: P, calculator: FeeCalculator) -> Self {
        Self { db, processor, calculator }
    }

    /// Quote the full price breakdown for a listing without committing to anything.
    pub async fn quote(&self, listing_id: &str, postal_code: &str) -> Result<FeeBreakdown, CheckoutError> {
        let listing = self
            .db
            .fetch_listing(listing_id)
            .await?
            .ok_or_else(|| CheckoutError::ListingNotFound(listing_id.to_string()))?;
        let seller = self
            .db
            .fetch_user(&listing.seller_id)
            .await?
            .ok_or_else(|| CheckoutError::UnknownSeller(listing.seller_id.clone()))?;
        Ok(self.calculator.quote(listing.price, postal_code, &listing.device_type, seller.tier))
    }

    /// Run the full checkout. Preconditions are checked in order; the first failure wins.
    ///
    /// The charge is authorized with the processor BEFORE the local row is written. If the insert
    /// then fails, the authorization is orphaned at the processor. It is never captured (the buyer
    /// has not confirmed it yet), so the only cleanup needed is its eventual expiry; the orphan is
    /// logged at error level so operators can reconcile.
    pub async fn checkout(&self, req: CheckoutRequest) -> Result<CheckoutReceipt, CheckoutError> {
        let buyer =
            self.db.fetch_user(&req.buyer_id).await?.ok_or_else(|| CheckoutError::UnknownBuyer(req.buyer_id.clone()))?;
        if buyer.banned {
            return Err(CheckoutError::BuyerBanned(req.buyer_id.clone()));
        }
        if req.ship_to.postal_code.trim().is_empty() {
            return Err(CheckoutError::MissingPostalCode);
        }
        let listing = self
            .db
            .fetch_listing(&req.listing_id)
            .await?
            .ok_or_else(|| CheckoutError::ListingNotFound(req.listing_id.clone()))?;
        if listing.status != ListingStatus::Active {
            return Err(CheckoutError::ListingNotActive(req.listing_id.clone()));
        }
        if listing.seller_id == req.buyer_id {
            return Err(CheckoutError::SelfPurchase);
        }
        let seller = self
            .db
            .fetch_user(&listing.seller_id)
            .await?
            .ok_or_else(|| CheckoutError::UnknownSeller(listing.seller_id.clone()))?;
        if !seller.is_admin && !seller.can_receive_payouts() {
            return Err(CheckoutError::SellerNotPayable(listing.seller_id.clone()));
        }
        // The buyer consented to the price they saw. A drift of a single cent either way is
        // tolerated for feeds that round display prices.
        if listing.price.abs_diff(req.expected_price) > 1 {
            return Err(CheckoutError::PriceChanged { expected: req.expected_price, actual: listing.price });
        }

        let breakdown = self.calculator.quote(listing.price, &req.ship_to.postal_code, &listing.device_type, seller.tier);
        let auth_request = NewAuthorization {
            amount: breakdown.total_amount,
            currency: CURRENCY_CODE_LOWER.to_string(),
            destination_account: if seller.is_admin { None } else { seller.connected_account_id.clone() },
            application_fee: breakdown.application_fee,
            description: format!("Purchase of listing {} by {}", listing.id, buyer.user_id),
        };
        let authorization = self.processor.create_authorization(auth_request).await?;
        debug!(
            "🛒️ Authorization [{}] created for listing [{}]: total {}",
            authorization.id, listing.id, breakdown.total_amount
        );

        let new_tx = NewTransaction {
            buyer_id: req.buyer_id,
            seller_id: listing.seller_id.clone(),
            listing_id: listing.id.clone(),
            sale_price: listing.price,
            breakdown: breakdown.clone(),
            payment_intent_id: authorization.id.clone(),
            payment_status: authorization.status.clone(),
            ship_to: req.ship_to,
        };
        let transaction = match self.db.insert_transaction(new_tx).await {
            Ok(tx) => tx,
            Err(e) => {
                error!(
                    "🛒️ Authorization [{}] is orphaned at the processor: the transaction record could not be \
                     written ({e}). The authorization was never captured and will expire.",
                    authorization.id
                );
                return Err(e.into());
            },
        };
        info!(
            "🛒️ Transaction #{} created: listing [{}], buyer [{}], total {}",
            transaction.id, transaction.listing_id, transaction.buyer_id, transaction.total_amount
        );
        Ok(CheckoutReceipt { transaction, client_secret: authorization.client_secret, breakdown })
    }
}
