use meg_common::Money;
use thiserror::Error;

use crate::{
    db_types::TransactionStatus,
    traits::{EscrowDatabaseError, ProcessorError},
};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Buyer {0} does not exist")]
    UnknownBuyer(String),
    #[error("Buyer {0} is banned from the marketplace")]
    BuyerBanned(String),
    #[error("A shipping address with a postal code is required")]
    MissingPostalCode,
    #[error("Listing {0} does not exist")]
    ListingNotFound(String),
    #[error("Listing {0} is no longer available")]
    ListingNotActive(String),
    #[error("Sellers cannot buy their own listings")]
    SelfPurchase,
    #[error("Seller {0} does not exist")]
    UnknownSeller(String),
    #[error("Seller {0} cannot receive payouts yet")]
    SellerNotPayable(String),
    #[error("The listing price has changed. Expected {expected}, but the listing is now {actual}")]
    PriceChanged { expected: Money, actual: Money },
    #[error("Payment processor error: {0}")]
    Processor(#[from] ProcessorError),
    #[error("Database error: {0}")]
    Database(#[from] EscrowDatabaseError),
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Transaction {0} does not exist")]
    TransactionNotFound(i64),
    #[error("No transaction exists for payment authorization {0}")]
    PaymentIntentNotFound(String),
    #[error("Only the seller can record a shipment")]
    NotSeller,
    #[error("Only the buyer or seller can act on this transaction")]
    NotParty,
    #[error("Tracking number {0} is not a recognised carrier format")]
    UnknownCarrier(String),
    #[error("Transaction {id} is in state {status} and cannot accept this operation")]
    WrongStatus { id: i64, status: TransactionStatus },
    #[error("Database error: {0}")]
    Database(#[from] EscrowDatabaseError),
}

#[derive(Debug, Error)]
pub enum DisputeError {
    #[error("Transaction {0} does not exist")]
    TransactionNotFound(i64),
    #[error("Transaction {0} has no open dispute")]
    NotDisputed(i64),
    #[error("A split resolution requires a refund amount")]
    MissingSplitAmount,
    #[error("Split refund amount {amount} must be positive and at most the item price {sale_price}")]
    InvalidSplitAmount { amount: Money, sale_price: Money },
    #[error("The refund could not be issued: {0}. The dispute remains open.")]
    RefundFailed(#[from] ProcessorError),
    #[error("The dispute on transaction {0} was resolved concurrently")]
    ResolutionRaced(i64),
    #[error("Database error: {0}")]
    Database(#[from] EscrowDatabaseError),
}

#[derive(Debug, Error)]
pub enum AccountSyncError {
    #[error("No user is linked to connected account {0}")]
    UnknownAccount(String),
    #[error("Payment processor error: {0}")]
    Processor(#[from] ProcessorError),
    #[error("Database error: {0}")]
    Database(#[from] EscrowDatabaseError),
}
