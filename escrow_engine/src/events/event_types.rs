use meg_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{DisputeStatus, Transaction};

/// Fired when a payment authorization is confirmed and the transaction enters escrow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmedEvent {
    pub transaction: Transaction,
}

impl PaymentConfirmedEvent {
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }
}

/// Fired when the seller records a shipment and the item starts moving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionShippedEvent {
    pub transaction: Transaction,
}

impl TransactionShippedEvent {
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }
}

/// Fired when the delivery reconciliation job confirms a carrier delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDeliveredEvent {
    pub transaction: Transaction,
}

impl TransactionDeliveredEvent {
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }
}

/// Fired when escrow is released and the seller payout becomes final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowReleasedEvent {
    pub transaction: Transaction,
    pub payout: Money,
}

impl EscrowReleasedEvent {
    pub fn new(transaction: Transaction) -> Self {
        let payout = transaction.seller_payout;
        Self { transaction, payout }
    }
}

/// Fired when a dispute reaches a final outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeResolvedEvent {
    pub transaction: Transaction,
    pub outcome: DisputeStatus,
    pub refunded: Option<Money>,
}

impl DisputeResolvedEvent {
    pub fn new(transaction: Transaction) -> Self {
        let outcome = transaction.dispute_status.unwrap_or(DisputeStatus::Open);
        let refunded = transaction.refunded_amount;
        Self { transaction, outcome, refunded }
    }
}
